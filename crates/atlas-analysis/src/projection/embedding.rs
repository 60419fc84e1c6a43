//! Neighbor-preserving non-linear embedding
//!
//! A compact fuzzy-graph layout in the style of UMAP:
//!
//! 1. **k-NN graph**: cosine neighbors of every point (shared neighbor engine).
//! 2. **Fuzzy memberships**: per point, `ρ` is the distance to the closest
//!    neighbor and `σ` is found by bisection so that
//!    `Σ exp(−max(0, d − ρ)/σ) = log2(k)`.
//! 3. **Symmetrization**: fuzzy union `w = a + b − a·b` of both directions.
//! 4. **Initialization**: linear projection rescaled to `[0, 10]` plus a small
//!    seeded jitter.
//! 5. **Optimization**: seeded SGD over the edges with negative sampling,
//!    attraction `1 / (1 + a·d^(2b))` where `(a, b)` are fitted to `min_dist`.
//!
//! Every random draw comes from one generator seeded with `random_state`, and
//! edges are processed in a fixed order, so the layout is reproducible.

use std::collections::BTreeMap;

use atlas_stats::matrix::Matrix;
use rand::{Rng as _, SeedableRng as _};
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;

use super::{LinearProjector, Projector};
use crate::neighbors::{self, Metric};

const SPREAD: f64 = 1.0;
const NEGATIVE_SAMPLE_RATE: usize = 5;
const INITIAL_ALPHA: f64 = 1.0;
const GRADIENT_CLIP: f64 = 4.0;
const SMOOTH_KNN_ITER: usize = 64;
const SMOOTH_KNN_TOLERANCE: f64 = 1e-5;
const MIN_SIGMA_SCALE: f64 = 1e-3;
const INIT_JITTER: f64 = 1e-4;

/// Fuzzy-graph 2D embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborEmbedding {
    /// Neighborhood size, counting the point itself.
    pub n_neighbors: usize,
    /// Minimum distance between embedded points.
    pub min_dist: f32,
    pub random_state: u64,
    /// Number of optimization epochs; chosen from the point count when `None`.
    pub n_epochs: Option<usize>,
}

impl NeighborEmbedding {
    #[must_use]
    pub fn new(n_neighbors: usize, min_dist: f32, random_state: u64) -> Self {
        Self {
            n_neighbors,
            min_dist,
            random_state,
            n_epochs: None,
        }
    }

    fn epochs(&self, n: usize) -> usize {
        self.n_epochs
            .unwrap_or(if n <= 10_000 { 500 } else { 200 })
            .max(1)
    }
}

impl Projector for NeighborEmbedding {
    #[expect(clippy::cast_possible_truncation)]
    fn project(&self, points: &Matrix) -> Vec<[f32; 2]> {
        let n = points.rows();
        let init = LinearProjector::new(self.random_state).project(points);
        if n < 3 {
            return init;
        }

        let k = neighbors::effective_k(self.n_neighbors.saturating_sub(1).max(1), n);
        let knn = neighbors::nearest_neighbors(points, k, Metric::Cosine);
        let edges = fuzzy_edges(&knn, k);
        let n_epochs = self.epochs(n);
        let (a, b) = fit_curve(f64::from(self.min_dist));

        let mut rng = Pcg32::seed_from_u64(self.random_state);
        let mut embedding = initial_layout(&init, &mut rng);
        optimize(&mut embedding, &edges, n_epochs, a, b, &mut rng);

        embedding
            .into_iter()
            .map(|[x, y]| [x as f32, y as f32])
            .collect()
    }
}

/// Directed weighted edge `head -> tail`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Edge {
    head: usize,
    tail: usize,
    weight: f64,
}

/// Builds the symmetrized fuzzy graph as a list of directed edges.
///
/// Both directions of every undirected edge are present, ordered by
/// `(head, tail)`.
fn fuzzy_edges(knn: &[Vec<neighbors::Neighbor>], k: usize) -> Vec<Edge> {
    #[expect(clippy::cast_precision_loss)]
    let target = (k as f64).log2();

    let mut directed = BTreeMap::<(usize, usize), f64>::new();
    for (i, row) in knn.iter().enumerate() {
        let distances = row
            .iter()
            .map(|n| f64::from(n.distance).max(0.0))
            .collect::<Vec<_>>();
        let (rho, sigma) = smooth_knn(&distances, target);
        for (neighbor, &d) in row.iter().zip(&distances) {
            let weight = if d - rho <= 0.0 {
                1.0
            } else {
                (-(d - rho) / sigma).exp()
            };
            directed.insert((i, neighbor.index), weight);
        }
    }

    let mut undirected = BTreeMap::<(usize, usize), f64>::new();
    for (&(i, j), &w) in &directed {
        let key = (i.min(j), i.max(j));
        if undirected.contains_key(&key) {
            continue;
        }
        let w_back = directed.get(&(j, i)).copied().unwrap_or(0.0);
        undirected.insert(key, w + w_back - w * w_back);
    }

    let mut edges = undirected
        .into_iter()
        .filter(|(_, w)| *w > 0.0)
        .flat_map(|((i, j), weight)| {
            [
                Edge {
                    head: i,
                    tail: j,
                    weight,
                },
                Edge {
                    head: j,
                    tail: i,
                    weight,
                },
            ]
        })
        .collect::<Vec<_>>();
    edges.sort_by(|x, y| (x.head, x.tail).cmp(&(y.head, y.tail)));
    edges
}

/// Finds `(ρ, σ)` for one point's sorted neighbor distances.
fn smooth_knn(distances: &[f64], target: f64) -> (f64, f64) {
    let rho = distances.iter().copied().find(|&d| d > 0.0).unwrap_or(0.0);
    #[expect(clippy::cast_precision_loss)]
    let mean_distance = if distances.is_empty() {
        0.0
    } else {
        distances.iter().sum::<f64>() / distances.len() as f64
    };

    let membership_sum = |sigma: f64| {
        distances
            .iter()
            .map(|&d| {
                let excess = d - rho;
                if excess > 0.0 {
                    (-excess / sigma).exp()
                } else {
                    1.0
                }
            })
            .sum::<f64>()
    };

    let (mut lo, mut hi, mut sigma) = (0.0_f64, f64::INFINITY, 1.0_f64);
    for _ in 0..SMOOTH_KNN_ITER {
        let sum = membership_sum(sigma);
        if (sum - target).abs() < SMOOTH_KNN_TOLERANCE {
            break;
        }
        if sum > target {
            hi = sigma;
            sigma = f64::midpoint(lo, hi);
        } else {
            lo = sigma;
            sigma = if hi.is_infinite() {
                sigma * 2.0
            } else {
                f64::midpoint(lo, hi)
            };
        }
    }

    let min_sigma = MIN_SIGMA_SCALE * mean_distance;
    (rho, sigma.max(min_sigma).max(f64::MIN_POSITIVE))
}

/// Fits `(a, b)` of `1 / (1 + a·x^(2b))` to the offset-exponential target curve.
///
/// The target is `1` below `min_dist` and `exp(−(x − min_dist)/spread)` above.
/// A coarse log-grid search is refined twice around the best point.
fn fit_curve(min_dist: f64) -> (f64, f64) {
    const SAMPLES: usize = 300;
    #[expect(clippy::cast_precision_loss)]
    let xs = (0..SAMPLES)
        .map(|i| 3.0 * SPREAD * i as f64 / (SAMPLES - 1) as f64)
        .collect::<Vec<_>>();
    let ys = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / SPREAD).exp()
            }
        })
        .collect::<Vec<_>>();
    let loss = |a: f64, b: f64| {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| (1.0 / (1.0 + a * x.powf(2.0 * b)) - y).powi(2))
            .sum::<f64>()
    };

    let (mut log_a, mut b) = (0.0_f64, 1.0_f64);
    let (mut log_a_span, mut b_span) = (3.0_f64, 0.95_f64);
    for steps in [60_i32, 20, 20] {
        let mut best = (f64::INFINITY, log_a, b);
        for i in -steps..=steps {
            let la = log_a + log_a_span * f64::from(i) / f64::from(steps);
            for j in -steps..=steps {
                let bb = b + b_span * f64::from(j) / f64::from(steps);
                if bb <= 0.0 {
                    continue;
                }
                let l = loss(la.exp(), bb);
                if l < best.0 {
                    best = (l, la, bb);
                }
            }
        }
        (log_a, b) = (best.1, best.2);
        log_a_span /= 10.0;
        b_span /= 10.0;
    }
    (log_a.exp(), b)
}

fn initial_layout(init: &[[f32; 2]], rng: &mut Pcg32) -> Vec<[f64; 2]> {
    let mut layout = init
        .iter()
        .map(|&[x, y]| [f64::from(x), f64::from(y)])
        .collect::<Vec<_>>();
    for axis in 0..2 {
        let (min, max) = layout
            .iter()
            .map(|p| p[axis])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        for p in &mut layout {
            p[axis] = if range > 0.0 {
                10.0 * (p[axis] - min) / range
            } else {
                0.0
            };
        }
    }
    for p in &mut layout {
        for v in p.iter_mut() {
            *v += INIT_JITTER * rng.sample::<f64, _>(StandardNormal);
        }
    }
    layout
}

#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn optimize(
    embedding: &mut [[f64; 2]],
    edges: &[Edge],
    n_epochs: usize,
    a: f64,
    b: f64,
    rng: &mut Pcg32,
) {
    let n = embedding.len();
    let max_weight = edges.iter().map(|e| e.weight).fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return;
    }
    let min_weight = max_weight / n_epochs as f64;
    let edges = edges
        .iter()
        .filter(|e| e.weight >= min_weight)
        .collect::<Vec<_>>();

    let epochs_per_sample = edges
        .iter()
        .map(|e| max_weight / e.weight)
        .collect::<Vec<_>>();
    let epochs_per_negative = epochs_per_sample
        .iter()
        .map(|e| e / NEGATIVE_SAMPLE_RATE as f64)
        .collect::<Vec<_>>();
    let mut next_sample = epochs_per_sample.clone();
    let mut next_negative = epochs_per_negative.clone();

    let clip = |v: f64| v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP);

    for epoch in 0..n_epochs {
        let alpha = INITIAL_ALPHA * (1.0 - epoch as f64 / n_epochs as f64);
        let epoch_f = epoch as f64;
        for (e, edge) in edges.iter().enumerate() {
            if next_sample[e] > epoch_f {
                continue;
            }
            let (i, j) = (edge.head, edge.tail);

            let diff = [
                embedding[i][0] - embedding[j][0],
                embedding[i][1] - embedding[j][1],
            ];
            let dist_sq = diff[0] * diff[0] + diff[1] * diff[1];
            if dist_sq > 0.0 {
                let coeff = (-2.0 * a * b * dist_sq.powf(b - 1.0)) / (a * dist_sq.powf(b) + 1.0);
                for d in 0..2 {
                    let grad = clip(coeff * diff[d]) * alpha;
                    embedding[i][d] += grad;
                    embedding[j][d] -= grad;
                }
            }
            next_sample[e] += epochs_per_sample[e];

            let n_negative = ((epoch_f - next_negative[e]) / epochs_per_negative[e]).max(0.0) as usize;
            for _ in 0..n_negative {
                let other = rng.random_range(0..n);
                if other == i {
                    continue;
                }
                let diff = [
                    embedding[i][0] - embedding[other][0],
                    embedding[i][1] - embedding[other][1],
                ];
                let dist_sq = diff[0] * diff[0] + diff[1] * diff[1];
                let coeff = if dist_sq > 0.0 {
                    2.0 * b / ((0.001 + dist_sq) * (a * dist_sq.powf(b) + 1.0))
                } else {
                    0.0
                };
                for d in 0..2 {
                    let grad = if coeff > 0.0 {
                        clip(coeff * diff[d])
                    } else {
                        GRADIENT_CLIP
                    };
                    embedding[i][d] += grad * alpha;
                }
            }
            next_negative[e] += n_negative as f64 * epochs_per_negative[e];
        }
    }
}
