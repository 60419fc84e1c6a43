//! Bundle build configuration
//!
//! [`BundleConfig`] carries every recognized option. It deserializes from JSON
//! with defaults for omitted fields, and [`BundleConfig::validate`] must pass
//! before the pipeline runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-response pooling strategy used upstream.
///
/// Selects which array of the per-role raw container (`mean_features` or
/// `max_features`) is read.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Mean,
    Max,
}

impl Strategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Mean => "mean",
            Strategy::Max => "max",
        }
    }

    /// Key of the response array inside a per-role raw container.
    #[must_use]
    pub fn container_key(self) -> String {
        format!("{}_features", self.as_str())
    }
}

/// Parameters of the neighbor-preserving embedding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingParams {
    /// Size of the local neighborhood used to build the fuzzy graph.
    pub n_neighbors: usize,
    /// Minimum separation between embedded points.
    pub min_dist: f32,
    /// Seed of the embedding optimizer.
    pub random_state: u64,
}

impl Default for EmbeddingParams {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            min_dist: 0.1,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Aggregated role x feature container.
    pub aggregated_file: PathBuf,
    /// Directory of per-role raw containers (`<role>.json`).
    pub features_dir: PathBuf,
    /// Output root; the bundle is written to `<output_dir>/<dataset_name>/`.
    pub output_dir: PathBuf,
    pub strategy: Strategy,
    /// Number of features to select.
    pub top_k: usize,
    /// Seed of the linear projection.
    pub random_seed: u64,
    /// Seed of the split-half partition.
    pub split_seed: u64,
    pub embedding: EmbeddingParams,
    /// Width of the high-D neighbor graph.
    pub neighbor_k: usize,
    /// Neighborhood size of the overlap quality check.
    pub quality_k: usize,
    /// Optional pre-fetched feature description cache.
    pub description_cache: Option<PathBuf>,
    pub dataset_name: String,
    /// Fill the selection with filtered-out features when too few pass.
    pub backfill: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            aggregated_file: PathBuf::from("outputs/aggregated/mean/per_role.json"),
            features_dir: PathBuf::from("outputs/features"),
            output_dir: PathBuf::from("outputs/viz_bundle"),
            strategy: Strategy::Mean,
            top_k: 2000,
            random_seed: 42,
            split_seed: 42,
            embedding: EmbeddingParams::default(),
            neighbor_k: 10,
            quality_k: 10,
            description_cache: None,
            dataset_name: "default".to_owned(),
            backfill: true,
        }
    }
}

impl BundleConfig {
    /// Checks every option and configured path.
    ///
    /// Runs before any input is read, so a failure means nothing was computed
    /// or written.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.aggregated_file.is_file() {
            return Err(ConfigError::AggregatedFileNotFound {
                path: self.aggregated_file.clone(),
            });
        }
        if !self.features_dir.is_dir() {
            return Err(ConfigError::FeaturesDirNotFound {
                path: self.features_dir.clone(),
            });
        }
        if let Some(cache) = &self.description_cache
            && !cache.is_file()
        {
            return Err(ConfigError::DescriptionCacheNotFound {
                path: cache.clone(),
            });
        }
        self.validate_parameters()
    }

    /// Checks the numeric options and dataset name only.
    pub fn validate_parameters(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("top_k", self.top_k),
            ("neighbor_k", self.neighbor_k),
            ("quality_k", self.quality_k),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.embedding.n_neighbors < 2 {
            return Err(ConfigError::EmbeddingNeighborsTooSmall {
                value: self.embedding.n_neighbors,
            });
        }
        let min_dist = self.embedding.min_dist;
        if !min_dist.is_finite() || !(0.0..=1.0).contains(&min_dist) {
            return Err(ConfigError::MinDistOutOfRange { value: min_dist });
        }
        if !is_valid_dataset_name(&self.dataset_name) {
            return Err(ConfigError::InvalidDatasetName {
                name: self.dataset_name.clone(),
            });
        }
        Ok(())
    }

    /// Directory receiving `bundle.json` and `features.csv`.
    #[must_use]
    pub fn dataset_dir(&self) -> PathBuf {
        self.output_dir.join(&self.dataset_name)
    }
}

fn is_valid_dataset_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.contains(['/', '\\'])
        && name != ".."
        && name != "."
        && !name.contains("..")
        && Path::new(name).components().count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_parameter_validation() {
        BundleConfig::default().validate_parameters().unwrap();
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let config = BundleConfig {
            top_k: 0,
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate_parameters(),
            Err(ConfigError::NotPositive { name: "top_k", .. })
        ));
    }

    #[test]
    fn test_zero_quality_k_is_rejected() {
        let config = BundleConfig {
            quality_k: 0,
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate_parameters(),
            Err(ConfigError::NotPositive {
                name: "quality_k",
                ..
            })
        ));
    }

    #[test]
    fn test_min_dist_out_of_range() {
        for value in [-0.1, 1.5, f32::NAN] {
            let config = BundleConfig {
                embedding: EmbeddingParams {
                    min_dist: value,
                    ..EmbeddingParams::default()
                },
                ..BundleConfig::default()
            };
            assert!(matches!(
                config.validate_parameters(),
                Err(ConfigError::MinDistOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_dataset_name_rules() {
        assert!(is_valid_dataset_name("default"));
        assert!(is_valid_dataset_name("gemma-run.2"));
        assert!(!is_valid_dataset_name(""));
        assert!(!is_valid_dataset_name("a/b"));
        assert!(!is_valid_dataset_name(".."));
        assert!(!is_valid_dataset_name("x..y"));
    }

    #[test]
    fn test_missing_paths_are_rejected() {
        let config = BundleConfig {
            aggregated_file: PathBuf::from("/nonexistent/per_role.json"),
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AggregatedFileNotFound { .. })
        ));
    }

    #[test]
    fn test_zero_neighbor_k_is_rejected() {
        let config = BundleConfig {
            neighbor_k: 0,
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate_parameters(),
            Err(ConfigError::NotPositive {
                name: "neighbor_k",
                value: 0
            })
        ));
    }

    #[test]
    fn test_embedding_neighbors_below_two_are_rejected() {
        for n_neighbors in [0, 1] {
            let config = BundleConfig {
                embedding: EmbeddingParams {
                    n_neighbors,
                    ..EmbeddingParams::default()
                },
                ..BundleConfig::default()
            };
            assert!(matches!(
                config.validate_parameters(),
                Err(ConfigError::EmbeddingNeighborsTooSmall { value }) if value == n_neighbors
            ));
        }
    }

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "atlas-config-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_features_dir_is_rejected() {
        let dir = temp_dir("features");
        let aggregated_file = dir.join("per_role.json");
        std::fs::write(&aggregated_file, "{}").unwrap();

        let config = BundleConfig {
            aggregated_file,
            features_dir: dir.join("missing"),
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FeaturesDirNotFound { .. })
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_description_cache_is_rejected() {
        let dir = temp_dir("cache");
        let aggregated_file = dir.join("per_role.json");
        std::fs::write(&aggregated_file, "{}").unwrap();

        let mut config = BundleConfig {
            aggregated_file,
            features_dir: dir.clone(),
            description_cache: Some(dir.join("descriptions.json")),
            ..BundleConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DescriptionCacheNotFound { .. })
        ));

        config.description_cache = None;
        config.validate().unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_strategy_parsing_and_keys() {
        assert_eq!("mean".parse::<Strategy>().unwrap(), Strategy::Mean);
        assert_eq!("max".parse::<Strategy>().unwrap(), Strategy::Max);
        assert!("median".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Max.container_key(), "max_features");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BundleConfig =
            serde_json::from_str(r#"{"top_k": 5, "embedding": {"min_dist": 0.3}}"#).unwrap();
        assert_eq!(config.top_k, 5);
        assert!((config.embedding.min_dist - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.embedding.n_neighbors, 15);
        assert_eq!(config.dataset_name, "default");
        assert!(config.backfill);
    }
}
