//! Per-feature statistics of the selected features
//!
//! Every selected feature is described across roles by:
//!
//! | Metric            | Definition                                              |
//! |-------------------|---------------------------------------------------------|
//! | `score`           | composite ranking score (`stability × sd`)              |
//! | `stability`       | split-half stability                                    |
//! | `sd`, `mu`        | population sd and mean of the log values                |
//! | `pref_ratio`      | `top1 / max(top2, 1e-8)` of the log values              |
//! | `active_frac`     | fraction of roles with a positive log value             |
//! | `cv`              | `sd / max(mu, 1e-8)`                                    |
//! | `mean_activation` | mean raw (pre-log) activation                           |
//! | `max_activation`  | max raw (pre-log) activation                            |
//! | `bridge_entropy`  | Shannon entropy of the non-negative log mass, / ln(n)   |
//!
//! `top2` is 0 when there is a single role, and the entropy is left
//! unnormalized in that case (it is then always 0).

use atlas_stats::{entropy, matrix::Matrix};

use crate::selection::{BasicFilter, FeatureRanking};

/// Lower bound of the denominators of ratio metrics.
const RATIO_EPSILON: f32 = 1e-8;

/// Number of roles reported per feature.
pub const TOP_ROLES: usize = 3;

/// Statistic bundle of one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureStatistic {
    pub score: f32,
    pub stability: f32,
    pub sd: f32,
    pub mu: f32,
    pub pref_ratio: f32,
    pub active_frac: f32,
    pub cv: f32,
    pub mean_activation: f32,
    pub max_activation: f32,
    pub bridge_entropy: f32,
}

/// One of the strongest roles of a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleShare {
    pub role_idx: usize,
    /// Log activation of the feature in this role.
    pub activation: f32,
    /// Share of the feature's total non-negative log mass.
    pub share: f32,
}

/// Role-level profile of one selected feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProfile {
    pub feature_id: usize,
    /// Role with the highest log activation (first on ties).
    pub preferred_role_idx: usize,
    pub top_roles: Vec<RoleShare>,
    pub statistic: FeatureStatistic,
}

/// Inputs shared by every profile computation.
#[derive(Debug, Clone, Copy)]
pub struct ProfileInputs<'a> {
    /// Role x feature `log(1 + x)` matrix (all features).
    pub log_matrix: &'a Matrix,
    /// Role x feature raw matrix (all features).
    pub raw_matrix: &'a Matrix,
    pub filter: &'a BasicFilter,
    pub ranking: &'a FeatureRanking,
    pub stability: &'a [f32],
}

impl ProfileInputs<'_> {
    /// Profiles every selected feature, in selection order.
    #[must_use]
    pub fn profiles(&self, selected: &[usize]) -> Vec<FeatureProfile> {
        selected.iter().map(|&f| self.profile(f)).collect()
    }

    /// Profiles one feature by its original index.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn profile(&self, feature_id: usize) -> FeatureProfile {
        let log_values = self.log_matrix.column(feature_id).collect::<Vec<_>>();
        let raw_values = self.raw_matrix.column(feature_id).collect::<Vec<_>>();
        let n_roles = log_values.len();

        let order = descending_order(&log_values);
        let top1 = order.first().map_or(0.0, |&r| log_values[r]);
        let top2 = order.get(1).map_or(0.0, |&r| log_values[r]);
        let active = log_values.iter().filter(|&&v| v > 0.0).count();

        let mu = self.filter.mu[feature_id];
        let sd = self.filter.sd[feature_id];
        let statistic = FeatureStatistic {
            score: self.ranking.score[feature_id],
            stability: self.stability[feature_id],
            sd,
            mu,
            pref_ratio: top1 / top2.max(RATIO_EPSILON),
            active_frac: if n_roles == 0 {
                0.0
            } else {
                active as f32 / n_roles as f32
            },
            cv: sd / mu.max(RATIO_EPSILON),
            mean_activation: mean(&raw_values),
            max_activation: raw_values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            bridge_entropy: entropy::normalized_entropy(&log_values),
        };

        FeatureProfile {
            feature_id,
            preferred_role_idx: argmax(&log_values),
            top_roles: top_roles(&log_values, &order),
            statistic,
        }
    }
}

/// Role indices by descending value, ascending index on ties.
fn descending_order(values: &[f32]) -> Vec<usize> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then_with(|| a.cmp(&b)));
    order
}

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(None::<(usize, f32)>, |best, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map_or(0, |(i, _)| i)
}

fn top_roles(values: &[f32], order: &[usize]) -> Vec<RoleShare> {
    let total = values.iter().map(|v| v.max(0.0)).sum::<f32>();
    order
        .iter()
        .take(TOP_ROLES)
        .map(|&role_idx| {
            let activation = values[role_idx];
            let share = if total > 0.0 {
                activation.max(0.0) / total
            } else {
                0.0
            };
            RoleShare {
                role_idx,
                activation,
                share,
            }
        })
        .collect()
}

#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{BackfillPolicy, Selection};

    struct Fixture {
        raw: Matrix,
        log: Matrix,
        filter: BasicFilter,
        ranking: FeatureRanking,
        stability: Vec<f32>,
    }

    impl Fixture {
        fn new(rows: &[Vec<f32>]) -> Self {
            let raw = Matrix::from_rows(rows).unwrap();
            let log = raw.map(f32::ln_1p);
            let filter = BasicFilter::from_log_matrix(&log);
            let stability = vec![1.0; raw.cols()];
            let ranking = FeatureRanking::new(&filter, &stability);
            Self {
                raw,
                log,
                filter,
                ranking,
                stability,
            }
        }

        fn inputs(&self) -> ProfileInputs<'_> {
            ProfileInputs {
                log_matrix: &self.log,
                raw_matrix: &self.raw,
                filter: &self.filter,
                ranking: &self.ranking,
                stability: &self.stability,
            }
        }
    }

    fn scenario() -> Fixture {
        Fixture::new(&[
            vec![1.0, 0.0, 5.0, 2.0],
            vec![0.0, 0.0, 3.0, 1.0],
            vec![2.0, 1.0, 0.0, 0.0],
        ])
    }

    #[test]
    fn test_scenario_feature_profile() {
        let fixture = scenario();
        let profile = fixture.inputs().profile(2);

        assert_eq!(profile.feature_id, 2);
        assert_eq!(profile.preferred_role_idx, 0);
        assert_eq!(
            profile.top_roles.iter().map(|r| r.role_idx).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let s = profile.statistic;
        assert!((s.pref_ratio - 6.0_f32.ln() / 4.0_f32.ln()).abs() < 1e-5);
        assert!((s.active_frac - 2.0 / 3.0).abs() < 1e-6);
        assert!((s.mean_activation - 8.0 / 3.0).abs() < 1e-6);
        assert!((s.max_activation - 5.0).abs() < 1e-6);
        assert!((s.cv - s.sd / s.mu).abs() < 1e-6);
        assert!(s.bridge_entropy > 0.0 && s.bridge_entropy < 1.0);
    }

    #[test]
    fn test_shares_sum_to_at_most_one() {
        let fixture = scenario();
        let inputs = fixture.inputs();
        for f in 0..4 {
            let profile = inputs.profile(f);
            let total = profile.top_roles.iter().map(|r| r.share).sum::<f32>();
            assert!(total <= 1.0 + 1e-6, "feature {f}: {total}");
            assert!(profile.top_roles.iter().all(|r| r.share >= 0.0));
        }
    }

    #[test]
    fn test_zero_mass_gives_zero_shares() {
        let fixture = Fixture::new(&[vec![0.0, 1.0], vec![0.0, 2.0]]);
        let profile = fixture.inputs().profile(0);
        assert!(profile.top_roles.iter().all(|r| r.share == 0.0));
        assert_eq!(profile.statistic.bridge_entropy, 0.0);
        assert_eq!(profile.statistic.active_frac, 0.0);
        assert_eq!(profile.statistic.pref_ratio, 0.0);
    }

    #[test]
    fn test_single_role_uses_zero_runner_up() {
        let fixture = Fixture::new(&[vec![3.0]]);
        let profile = fixture.inputs().profile(0);
        assert_eq!(profile.top_roles.len(), 1);
        assert!((profile.top_roles[0].share - 1.0).abs() < 1e-6);
        let expected = 4.0_f32.ln() / RATIO_EPSILON;
        assert!((profile.statistic.pref_ratio / expected - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_profiles_follow_selection_order() {
        let fixture = scenario();
        let selection = Selection::top_k(
            &fixture.ranking,
            &fixture.filter,
            2,
            BackfillPolicy::Backfill,
        );
        let profiles = fixture.inputs().profiles(&selection.indices);
        assert_eq!(
            profiles.iter().map(|p| p.feature_id).collect::<Vec<_>>(),
            selection.indices
        );
    }

    #[test]
    fn test_ties_prefer_lower_role_index() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(descending_order(&[2.0, 5.0, 2.0]), vec![1, 0, 2]);
    }
}
