//! Feature ranking and selection
//!
//! Features are scored on the `log(1 + x)` role matrix:
//!
//! 1. **Basic filter** ([`BasicFilter`]): a feature is *alive* when its mean
//!    across roles is positive. The standard-deviation threshold is the median
//!    sd among alive features (0 when none is alive). A feature passes when it
//!    is alive and its sd reaches the threshold.
//! 2. **Composite score** ([`FeatureRanking`]): `stability × sd` for passing
//!    features, [`FILTERED_SCORE`] for the rest so they always rank last.
//! 3. **Selection** ([`Selection`]): the top `min(top_k, width)` features by
//!    score, descending, ties broken by ascending feature index.
//!
//! When fewer than `top_k` features pass, the remainder is back-filled with
//! filtered features in index order unless back-fill is disabled. The number
//! of back-filled features is reported so the output metadata can expose it.

use atlas_stats::{descriptive::ColumnStats, matrix::Matrix, percentiles};
use serde::Serialize;

/// Score assigned to features failing the basic filter.
///
/// Valid scores are products of a stability in `[0, 1]` and a non-negative sd,
/// so this value is strictly below any of them.
pub const FILTERED_SCORE: f32 = -1.0;

/// Per-feature mean/sd of the log-activation matrix and the basic filter outcome.
#[derive(Debug, Clone)]
pub struct BasicFilter {
    pub mu: Vec<f32>,
    pub sd: Vec<f32>,
    pub alive: Vec<bool>,
    pub passes: Vec<bool>,
    pub sd_threshold: f32,
}

impl BasicFilter {
    /// Evaluates the basic filter on a role x feature log-activation matrix.
    #[must_use]
    pub fn from_log_matrix(log_matrix: &Matrix) -> Self {
        let stats = ColumnStats::from_matrix(log_matrix);
        let mu = stats.iter().map(|s| s.mean).collect::<Vec<_>>();
        let sd = stats.iter().map(|s| s.std_dev).collect::<Vec<_>>();
        let alive = mu.iter().map(|&m| m > 0.0).collect::<Vec<_>>();

        let sd_threshold = percentiles::median(
            sd.iter()
                .zip(&alive)
                .filter(|(s, alive)| **alive && s.is_finite())
                .map(|(&s, _)| s),
        )
        .unwrap_or(0.0);

        let passes = alive
            .iter()
            .zip(&sd)
            .map(|(&alive, &s)| alive && s >= sd_threshold)
            .collect();

        Self {
            mu,
            sd,
            alive,
            passes,
            sd_threshold,
        }
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    #[must_use]
    pub fn pass_count(&self) -> usize {
        self.passes.iter().filter(|p| **p).count()
    }
}

/// Composite scores for every feature.
#[derive(Debug, Clone)]
pub struct FeatureRanking {
    pub score: Vec<f32>,
}

impl FeatureRanking {
    /// Computes `stability × sd`, forcing filtered features to [`FILTERED_SCORE`].
    #[must_use]
    pub fn new(filter: &BasicFilter, stability: &[f32]) -> Self {
        debug_assert_eq!(filter.sd.len(), stability.len());
        let score = filter
            .passes
            .iter()
            .zip(&filter.sd)
            .zip(stability)
            .map(|((&passes, &sd), &stability)| {
                let score = stability * sd;
                if passes && score.is_finite() {
                    score
                } else {
                    FILTERED_SCORE
                }
            })
            .collect();
        Self { score }
    }

    /// Feature indices sorted by descending score, ascending index on ties.
    #[must_use]
    pub fn order(&self) -> Vec<usize> {
        let mut order = (0..self.score.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| {
            self.score[b]
                .total_cmp(&self.score[a])
                .then_with(|| a.cmp(&b))
        });
        order
    }
}

/// How to complete the selection when too few features pass the basic filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackfillPolicy {
    /// Fill up to `top_k` with filtered features in index order.
    Backfill,
    /// Keep passing features only; the selection may be shorter than `top_k`.
    PassingOnly,
}

impl BackfillPolicy {
    #[must_use]
    pub fn from_flag(backfill: bool) -> Self {
        if backfill {
            Self::Backfill
        } else {
            Self::PassingOnly
        }
    }
}

/// Ordered subset of selected features.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Original feature indices in selection order (the `feature_row` ordinal).
    pub indices: Vec<usize>,
    /// Number of selected features that fail the basic filter.
    pub backfilled_count: usize,
    pub policy: BackfillPolicy,
}

impl Selection {
    /// Picks the top `min(top_k, width)` features.
    #[must_use]
    pub fn top_k(
        ranking: &FeatureRanking,
        filter: &BasicFilter,
        top_k: usize,
        policy: BackfillPolicy,
    ) -> Self {
        let limit = top_k.min(ranking.score.len());
        let indices = ranking
            .order()
            .into_iter()
            .filter(|&f| policy == BackfillPolicy::Backfill || filter.passes[f])
            .take(limit)
            .collect::<Vec<_>>();
        let backfilled_count = indices.iter().filter(|&&f| !filter.passes[f]).count();
        Self {
            indices,
            backfilled_count,
            policy,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
