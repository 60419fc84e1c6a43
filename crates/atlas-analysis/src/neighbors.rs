//! k-nearest-neighbor search
//!
//! One brute-force routine, [`nearest_neighbors`], parameterized by [`Metric`]
//! and `k`, serves every call site:
//!
//! - the high-D feature graph ([`NeighborGraph`], cosine),
//! - the overlap quality check ([`quality`](crate::quality), cosine vs Euclidean),
//! - the fuzzy graph of the neighbor embedding
//!   ([`projection::embedding`](crate::projection::embedding)).
//!
//! Each point's own index is excluded. Candidates are ordered by ascending
//! distance, ties by ascending index, and `k` is capped at `n - 1`.

use atlas_stats::{matrix::Matrix, vector};
use serde::Serialize;

/// Index used for unused neighbor slots.
pub const SENTINEL_INDEX: i64 = -1;

/// Distance metric for neighbor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `1 - cosine_similarity`; zero vectors have similarity 0 to everything.
    Cosine,
    Euclidean,
}

/// One neighbor of a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Effective neighborhood size: `min(k, n - 1)`, or 0 when `n <= 1`.
#[must_use]
pub fn effective_k(k: usize, n: usize) -> usize {
    k.min(n.saturating_sub(1))
}

/// Finds the `effective_k(k, n)` nearest neighbors of every row of `points`.
///
/// Returns one list per point, each sorted by ascending distance with ties
/// broken by ascending index. Returns empty lists when `n <= 1` or `k == 0`.
#[must_use]
pub fn nearest_neighbors(points: &Matrix, k: usize, metric: Metric) -> Vec<Vec<Neighbor>> {
    let n = points.rows();
    let k_eff = effective_k(k, n);
    if k_eff == 0 {
        return vec![vec![]; n];
    }

    let norms: Vec<f32> = match metric {
        Metric::Cosine => points.iter_rows().map(vector::norm).collect(),
        Metric::Euclidean => vec![],
    };
    let distance = |i: usize, j: usize| match metric {
        Metric::Cosine => {
            1.0 - vector::cosine_with_norms(points.row(i), points.row(j), norms[i], norms[j])
        }
        Metric::Euclidean => vector::euclidean_distance(points.row(i), points.row(j)),
    };

    (0..n)
        .map(|i| {
            let mut candidates = (0..n)
                .filter(|&j| j != i)
                .map(|j| Neighbor {
                    index: j,
                    distance: distance(i, j),
                })
                .collect::<Vec<_>>();
            candidates.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.index.cmp(&b.index))
            });
            candidates.truncate(k_eff);
            candidates
        })
        .collect()
}

/// Fixed-width cosine neighbor graph over a set of points.
///
/// Every row has exactly `k` slots. Slots beyond the effective neighborhood
/// hold [`SENTINEL_INDEX`] with similarity `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborGraph {
    pub k: usize,
    pub indices: Vec<Vec<i64>>,
    pub similarities: Vec<Vec<f32>>,
}

impl NeighborGraph {
    /// Builds the cosine graph with `k` slots per point.
    ///
    /// With `n <= 1` points or `k == 0` the graph is empty (width 0).
    #[must_use]
    pub fn cosine(points: &Matrix, k: usize) -> Self {
        let n = points.rows();
        if n <= 1 || k == 0 {
            return Self {
                k: 0,
                indices: vec![vec![]; n],
                similarities: vec![vec![]; n],
            };
        }

        let mut indices = vec![vec![SENTINEL_INDEX; k]; n];
        let mut similarities = vec![vec![0.0; k]; n];
        for (i, neighbors) in nearest_neighbors(points, k, Metric::Cosine)
            .into_iter()
            .enumerate()
        {
            for (slot, neighbor) in neighbors.into_iter().enumerate() {
                indices[i][slot] = i64::try_from(neighbor.index).unwrap_or(SENTINEL_INDEX);
                similarities[i][slot] = 1.0 - neighbor.distance;
            }
        }
        Self {
            k,
            indices,
            similarities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![0.9, 0.1],
            vec![0.0, 1.0],
            vec![0.1, 0.9],
        ])
        .unwrap()
    }

    #[test]
    fn test_effective_k() {
        assert_eq!(effective_k(5, 3), 2);
        assert_eq!(effective_k(2, 10), 2);
        assert_eq!(effective_k(3, 1), 0);
        assert_eq!(effective_k(3, 0), 0);
    }

    #[test]
    fn test_cosine_neighbors_exclude_self() {
        let result = nearest_neighbors(&points(), 2, Metric::Cosine);
        for (i, neighbors) in result.iter().enumerate() {
            assert_eq!(neighbors.len(), 2);
            assert!(neighbors.iter().all(|n| n.index != i));
        }
        assert_eq!(result[0][0].index, 1);
        assert_eq!(result[2][0].index, 3);
    }

    #[test]
    fn test_ties_broken_by_index() {
        let m = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![-1.0]]).unwrap();
        let result = nearest_neighbors(&m, 2, Metric::Euclidean);
        assert_eq!(
            result[0].iter().map(|n| n.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_graph_sentinel_fill() {
        let m = Matrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let graph = NeighborGraph::cosine(&m, 4);
        assert_eq!(graph.k, 4);
        for (i, row) in graph.indices.iter().enumerate() {
            assert_eq!(row.len(), 4);
            assert_eq!(&row[2..], &[SENTINEL_INDEX, SENTINEL_INDEX]);
            assert!(row.iter().all(|&j| j != i64::try_from(i).unwrap()));
            assert_eq!(&graph.similarities[i][2..], &[0.0, 0.0]);
        }
        // Diagonal vector is closest to both axes.
        assert_eq!(graph.indices[0][0], 2);
        assert!((graph.similarities[0][0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_graph_degenerate_inputs() {
        let single = Matrix::from_rows(&[vec![1.0, 2.0]]).unwrap();
        let graph = NeighborGraph::cosine(&single, 3);
        assert_eq!(graph.k, 0);
        assert_eq!(graph.indices, vec![Vec::<i64>::new()]);

        let graph = NeighborGraph::cosine(&points(), 0);
        assert_eq!(graph.k, 0);
        assert!(graph.indices.iter().all(Vec::is_empty));
    }
}
