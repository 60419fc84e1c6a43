//! Manifold-preservation quality check
//!
//! Compares each point's neighborhood in the original high-D space (cosine)
//! with its neighborhood in the 2D projection (Euclidean). The score is the
//! mean over points of `|high ∩ low| / k_eff`, so it lies in `[0, 1]` and is
//! `1.0` exactly when every neighborhood survives the projection.

use std::collections::HashSet;

use atlas_stats::matrix::Matrix;

use crate::neighbors::{self, Metric};

/// Result of the overlap check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnOverlap {
    /// Neighborhood size actually used, `min(k, n - 1)`.
    pub k_eff: usize,
    pub score: f32,
}

/// Computes the mean k-NN overlap between `high_d` rows and `low_d` points.
///
/// Returns a score of `0.0` when there are fewer than two points or `k == 0`.
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn knn_overlap(high_d: &Matrix, low_d: &[[f32; 2]], k: usize) -> KnnOverlap {
    let n = high_d.rows();
    debug_assert_eq!(n, low_d.len());
    let k_eff = neighbors::effective_k(k, n);
    if k_eff == 0 {
        return KnnOverlap { k_eff, score: 0.0 };
    }

    let low_matrix = Matrix::from_vec(n, 2, low_d.iter().flatten().copied().collect())
        .unwrap_or_else(|| Matrix::zeros(n, 2));
    let high = neighbors::nearest_neighbors(high_d, k_eff, Metric::Cosine);
    let low = neighbors::nearest_neighbors(&low_matrix, k_eff, Metric::Euclidean);

    let total = high
        .iter()
        .zip(&low)
        .map(|(h, l)| {
            let h = h.iter().map(|n| n.index).collect::<HashSet<_>>();
            let shared = l.iter().filter(|n| h.contains(&n.index)).count();
            shared as f64 / k_eff as f64
        })
        .sum::<f64>();
    KnnOverlap {
        k_eff,
        score: (total / n as f64) as f32,
    }
}
