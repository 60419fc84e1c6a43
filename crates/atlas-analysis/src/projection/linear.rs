//! Principal-component projection
//!
//! Points are centered per column and projected on the two leading
//! eigenvectors of their covariance matrix. Eigenvectors are found by power
//! iteration with deflation:
//!
//! 1. Start from a seeded standard-normal vector `v`.
//! 2. Iterate `v ← C v / ‖C v‖` until it stops moving.
//! 3. `λ = vᵀ C v`; deflate `C ← C − λ v vᵀ` and repeat for the next component.
//!
//! Each eigenvector's sign is fixed so that its largest-magnitude loading is
//! positive, which makes the output independent of the starting vector.

use atlas_stats::matrix::Matrix;
use rand::{Rng as _, SeedableRng as _};
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;

use super::Projector;

const MAX_ITER: usize = 1000;
const TOLERANCE: f64 = 1e-10;

/// Linear, variance-maximizing 2D projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearProjector {
    /// Seed of the power-iteration starting vectors.
    pub seed: u64,
}

impl LinearProjector {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Projector for LinearProjector {
    #[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn project(&self, points: &Matrix) -> Vec<[f32; 2]> {
        let (n, d) = points.shape();
        if n == 0 {
            return vec![];
        }

        let mut means = vec![0.0_f64; d];
        for row in points.iter_rows() {
            for (m, &v) in means.iter_mut().zip(row) {
                *m += f64::from(v);
            }
        }
        means.iter_mut().for_each(|m| *m /= n as f64);
        let centered = points
            .iter_rows()
            .map(|row| {
                row.iter()
                    .zip(&means)
                    .map(|(&v, m)| f64::from(v) - m)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut covariance = covariance(&centered, d);
        let mut rng = Pcg32::seed_from_u64(self.seed);
        let mut components = Vec::with_capacity(2);
        for _ in 0..2.min(d) {
            let Some((eigenvalue, v)) = leading_eigenvector(&covariance, d, &mut rng) else {
                break;
            };
            for i in 0..d {
                for j in 0..d {
                    covariance[i * d + j] -= eigenvalue * v[i] * v[j];
                }
            }
            components.push(v);
        }

        centered
            .iter()
            .map(|row| {
                let mut coord = [0.0_f32; 2];
                for (c, component) in components.iter().enumerate() {
                    coord[c] = dot(row, component) as f32;
                }
                coord
            })
            .collect()
    }
}

/// Sample covariance (`d x d`, row-major) of centered rows.
#[expect(clippy::cast_precision_loss)]
fn covariance(centered: &[Vec<f64>], d: usize) -> Vec<f64> {
    let mut cov = vec![0.0_f64; d * d];
    for row in centered {
        for i in 0..d {
            let ri = row[i];
            for j in i..d {
                cov[i * d + j] += ri * row[j];
            }
        }
    }
    let denominator = centered.len().saturating_sub(1).max(1) as f64;
    for i in 0..d {
        for j in i..d {
            let value = cov[i * d + j] / denominator;
            cov[i * d + j] = value;
            cov[j * d + i] = value;
        }
    }
    cov
}

/// Power iteration on a symmetric positive semi-definite matrix.
///
/// Returns `None` when the matrix has no remaining variance.
fn leading_eigenvector(matrix: &[f64], d: usize, rng: &mut Pcg32) -> Option<(f64, Vec<f64>)> {
    let mut v = (0..d)
        .map(|_| rng.sample::<f64, _>(StandardNormal))
        .collect::<Vec<_>>();
    normalize(&mut v)?;

    for _ in 0..MAX_ITER {
        let mut w = mat_vec(matrix, &v);
        normalize(&mut w)?;
        let delta = w
            .iter()
            .zip(&v)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        v = w;
        if delta < TOLERANCE {
            break;
        }
    }

    let eigenvalue = dot(&v, &mat_vec(matrix, &v));
    if eigenvalue <= 1e-12 {
        return None;
    }

    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    Some((eigenvalue, v))
}

fn mat_vec(matrix: &[f64], v: &[f64]) -> Vec<f64> {
    matrix.chunks_exact(v.len()).map(|row| dot(row, v)).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scales `v` to unit length; `None` if it is (numerically) zero.
fn normalize(v: &mut [f64]) -> Option<()> {
    let norm = dot(v, v).sqrt();
    if norm <= 1e-12 || !norm.is_finite() {
        return None;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    Some(())
}
