//! Visualization bundle document
//!
//! The bundle is the terminal artifact of a run. Its JSON layout:
//!
//! ```text
//! {
//!   "dataset":         run descriptor (inputs, sizes, seeds, selection counts)
//!   "guardrails":      navigation note and neighbor-overlap quality
//!   "roles":           role names, in matrix order
//!   "feature_ids":     original indices of the selected features
//!   "coords":          {"nonlinear": [[x, y]], "linear": [[x, y]]}
//!   "neighbors":       {"k", "indices", "similarities"} (high-D cosine)
//!   "role_similarity": role x role cosine similarity
//!   "features":        one row per selected feature
//! }
//! ```
//!
//! Every float is passed through [`rounding::sanitize`] when the document is
//! built, so the serialized form is stable across runs.

use std::path::Path;

use atlas_stats::{matrix::Matrix, rounding, vector};
use serde::Serialize;

use crate::{
    config::{BundleConfig, Strategy},
    descriptions::Description,
    neighbors::NeighborGraph,
    projection::ProjectionResult,
    quality::KnnOverlap,
    selection::{BackfillPolicy, BasicFilter, Selection},
    statistics::{FeatureProfile, FeatureStatistic},
};

/// Note attached to every bundle.
pub const GUARDRAIL_NOTE: &str =
    "Use map for navigation only. Related features and role similarity use high-D cosine space.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bundle {
    pub dataset: DatasetInfo,
    pub guardrails: Guardrails,
    pub roles: Vec<String>,
    pub feature_ids: Vec<usize>,
    pub coords: Coords,
    pub neighbors: Neighbors,
    pub role_similarity: Vec<Vec<f64>>,
    pub features: Vec<FeatureRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub aggregated_file: String,
    pub features_dir: String,
    pub strategy: Strategy,
    pub n_roles: usize,
    pub feature_width: usize,
    /// Effective selection size, `min(top_k, feature_width)`.
    pub top_k: usize,
    pub random_seed: u64,
    pub split_seed: u64,
    pub embedding: EmbeddingInfo,
    pub selection: SelectionInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingInfo {
    pub n_neighbors: usize,
    pub min_dist: f64,
    pub random_state: u64,
}

/// Selection bookkeeping, including how many filtered features were back-filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionInfo {
    pub alive_count: usize,
    pub pass_basic_count: usize,
    pub backfilled_count: usize,
    pub sd_threshold: f64,
    pub backfill_policy: BackfillPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guardrails {
    pub note: String,
    pub knn_overlap_at_k: usize,
    pub knn_overlap_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coords {
    pub nonlinear: Vec<[f64; 2]>,
    pub linear: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbors {
    pub k: usize,
    pub indices: Vec<Vec<i64>>,
    pub similarities: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub feature_row: usize,
    pub feature_id: usize,
    pub preferred_role_idx: usize,
    pub preferred_role: String,
    pub top_roles: Vec<TopRole>,
    pub metrics: Metrics,
    pub description: Option<String>,
    pub neuronpedia_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRole {
    pub role_idx: usize,
    pub role: String,
    pub activation: f64,
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub score: f64,
    pub stability: f64,
    pub sd: f64,
    pub mu: f64,
    pub pref_ratio: f64,
    pub active_frac: f64,
    pub cv: f64,
    pub mean_activation: f64,
    pub max_activation: f64,
    pub bridge_entropy: f64,
}

impl From<&FeatureStatistic> for Metrics {
    fn from(s: &FeatureStatistic) -> Self {
        let f = rounding::sanitize;
        Self {
            score: f(s.score),
            stability: f(s.stability),
            sd: f(s.sd),
            mu: f(s.mu),
            pref_ratio: f(s.pref_ratio),
            active_frac: f(s.active_frac),
            cv: f(s.cv),
            mean_activation: f(s.mean_activation),
            max_activation: f(s.max_activation),
            bridge_entropy: f(s.bridge_entropy),
        }
    }
}

impl DatasetInfo {
    #[must_use]
    pub fn new(
        config: &BundleConfig,
        n_roles: usize,
        feature_width: usize,
        filter: &BasicFilter,
        selection: &Selection,
    ) -> Self {
        Self {
            name: config.dataset_name.clone(),
            aggregated_file: path_string(&config.aggregated_file),
            features_dir: path_string(&config.features_dir),
            strategy: config.strategy,
            n_roles,
            feature_width,
            top_k: config.top_k.min(feature_width),
            random_seed: config.random_seed,
            split_seed: config.split_seed,
            embedding: EmbeddingInfo {
                n_neighbors: config.embedding.n_neighbors,
                min_dist: rounding::sanitize(config.embedding.min_dist),
                random_state: config.embedding.random_state,
            },
            selection: SelectionInfo {
                alive_count: filter.alive_count(),
                pass_basic_count: filter.pass_count(),
                backfilled_count: selection.backfilled_count,
                sd_threshold: rounding::sanitize(filter.sd_threshold),
                backfill_policy: selection.policy,
            },
        }
    }
}

impl Guardrails {
    #[must_use]
    pub fn new(overlap: KnnOverlap) -> Self {
        Self {
            note: GUARDRAIL_NOTE.to_owned(),
            knn_overlap_at_k: overlap.k_eff,
            knn_overlap_score: rounding::sanitize(overlap.score),
        }
    }
}

impl From<&ProjectionResult> for Coords {
    fn from(projection: &ProjectionResult) -> Self {
        Self {
            nonlinear: sanitize_points(&projection.nonlinear),
            linear: sanitize_points(&projection.linear),
        }
    }
}

impl From<&NeighborGraph> for Neighbors {
    fn from(graph: &NeighborGraph) -> Self {
        Self {
            k: graph.k,
            indices: graph.indices.clone(),
            similarities: graph
                .similarities
                .iter()
                .map(|row| sanitize_all(row))
                .collect(),
        }
    }
}

impl FeatureRow {
    /// Builds the row of the `feature_row`-th selected feature.
    #[must_use]
    pub fn new(
        feature_row: usize,
        profile: &FeatureProfile,
        role_names: &[String],
        description: Option<&Description>,
    ) -> Self {
        let role_name = |idx: usize| role_names.get(idx).cloned().unwrap_or_default();
        let (description, neuronpedia_url) = description
            .map(|d| (d.description.clone(), d.url.clone()))
            .unwrap_or_default();
        Self {
            feature_row,
            feature_id: profile.feature_id,
            preferred_role_idx: profile.preferred_role_idx,
            preferred_role: role_name(profile.preferred_role_idx),
            top_roles: profile
                .top_roles
                .iter()
                .map(|role| TopRole {
                    role_idx: role.role_idx,
                    role: role_name(role.role_idx),
                    activation: rounding::sanitize(role.activation),
                    share: rounding::sanitize(role.share),
                })
                .collect(),
            metrics: Metrics::from(&profile.statistic),
            description,
            neuronpedia_url,
        }
    }
}

/// Cosine similarity between every pair of rows.
///
/// Used on the role x selected-feature log matrix, giving a role x role
/// matrix with ones on the diagonal for non-zero roles.
#[must_use]
pub fn row_similarity(rows: &Matrix) -> Vec<Vec<f32>> {
    let norms = rows.iter_rows().map(vector::norm).collect::<Vec<_>>();
    let n = rows.rows();
    let mut similarity = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let s = vector::cosine_with_norms(rows.row(i), rows.row(j), norms[i], norms[j]);
            similarity[i][j] = s;
            similarity[j][i] = s;
        }
    }
    similarity
}

pub(crate) fn sanitize_all(values: &[f32]) -> Vec<f64> {
    values.iter().copied().map(rounding::sanitize).collect()
}

fn sanitize_points(points: &[[f32; 2]]) -> Vec<[f64; 2]> {
    points
        .iter()
        .map(|&[x, y]| [rounding::sanitize(x), rounding::sanitize(y)])
        .collect()
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::RoleShare;

    fn profile() -> FeatureProfile {
        FeatureProfile {
            feature_id: 17,
            preferred_role_idx: 1,
            top_roles: vec![
                RoleShare {
                    role_idx: 1,
                    activation: 2.0,
                    share: 0.666_666_7,
                },
                RoleShare {
                    role_idx: 0,
                    activation: 1.0,
                    share: 0.333_333_34,
                },
            ],
            statistic: FeatureStatistic {
                score: 0.5,
                stability: f32::NAN,
                sd: 0.5,
                mu: 1.5,
                pref_ratio: 2.0,
                active_frac: 1.0,
                cv: 1.0 / 3.0,
                mean_activation: 3.0,
                max_activation: f32::INFINITY,
                bridge_entropy: 0.918_295_8,
            },
        }
    }

    fn roles() -> Vec<String> {
        vec!["analyst".to_owned(), "pirate".to_owned()]
    }

    #[test]
    fn test_feature_row_without_description_has_null_fields() {
        let row = FeatureRow::new(0, &profile(), &roles(), None);
        assert_eq!(row.preferred_role, "pirate");
        assert_eq!(row.description, None);
        assert_eq!(row.neuronpedia_url, None);

        let json = serde_json::to_value(&row).unwrap();
        assert!(json["description"].is_null());
        assert!(json["neuronpedia_url"].is_null());
    }

    #[test]
    fn test_feature_row_values_are_sanitized() {
        let description = Description {
            description: Some("sea talk".to_owned()),
            url: None,
        };
        let row = FeatureRow::new(3, &profile(), &roles(), Some(&description));
        assert_eq!(row.feature_row, 3);
        assert_eq!(row.feature_id, 17);
        assert_eq!(row.description.as_deref(), Some("sea talk"));
        assert_eq!(row.metrics.stability, 0.0);
        assert_eq!(row.metrics.max_activation, 0.0);
        assert_eq!(row.metrics.cv, 0.333_333);
        assert_eq!(row.top_roles[0].role, "pirate");
        assert_eq!(row.top_roles[0].share, 0.666_667);
        assert_eq!(row.top_roles[1].role, "analyst");
    }

    #[test]
    fn test_row_similarity_is_symmetric_with_unit_diagonal() {
        let m = Matrix::from_rows(&[vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]]).unwrap();
        let s = row_similarity(&m);
        assert!((s[0][0] - 1.0).abs() < 1e-6);
        assert!((s[1][1] - 1.0).abs() < 1e-6);
        assert_eq!(s[2][2], 0.0);
        assert!((s[0][1] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(s[0][1], s[1][0]);
    }

    #[test]
    fn test_guardrails_carry_note_and_overlap() {
        let guardrails = Guardrails::new(KnnOverlap {
            k_eff: 4,
            score: 0.75,
        });
        assert_eq!(guardrails.note, GUARDRAIL_NOTE);
        assert_eq!(guardrails.knn_overlap_at_k, 4);
        assert_eq!(guardrails.knn_overlap_score, 0.75);
    }
}
