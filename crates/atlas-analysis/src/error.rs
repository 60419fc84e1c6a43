//! Error taxonomy for bundle construction
//!
//! Two classes of failure abort a run:
//!
//! - [`ConfigError`]: an option is out of range or a configured path is unusable.
//!   Raised by [`BundleConfig::validate`](crate::config::BundleConfig::validate)
//!   before any computation starts.
//! - [`DataIntegrityError`]: an upstream artifact is inconsistent (missing role
//!   file, width mismatch, too few responses). Inputs are static outputs of an
//!   earlier stage, so these are never retried.
//!
//! Malformed description cache entries are not errors; they are skipped and
//! reported with a warning (see [`descriptions`](crate::descriptions)).

use std::{io, path::PathBuf};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("Aggregated file does not exist or is not a file: {}", path.display())]
    AggregatedFileNotFound { path: PathBuf },
    #[display("Features directory does not exist or is not a directory: {}", path.display())]
    FeaturesDirNotFound { path: PathBuf },
    #[display("Description cache does not exist or is not a file: {}", path.display())]
    DescriptionCacheNotFound { path: PathBuf },
    #[display("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: usize },
    #[display("embedding n_neighbors must be at least 2, got {value}")]
    EmbeddingNeighborsTooSmall { value: usize },
    #[display("embedding min_dist must be within [0, 1], got {value}")]
    MinDistOutOfRange { value: f32 },
    #[display("Invalid dataset name '{name}': must be non-empty and must not contain path separators or '..'")]
    InvalidDatasetName { name: String },
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DataIntegrityError {
    #[display("Aggregated matrix contains no roles")]
    NoRoles,
    #[display("Aggregated matrix has zero feature width")]
    ZeroWidth,
    #[display("Aggregated matrix has {rows} rows but {names} role names")]
    RoleCountMismatch { rows: usize, names: usize },
    #[display("Aggregated matrix rows have inconsistent widths")]
    RaggedMatrix,
    #[display("Aggregated value for role '{role}' feature {feature} is not finite")]
    NonFiniteValue { role: String, feature: usize },
    #[display("Duplicate role name '{role}'")]
    DuplicateRole { role: String },
    #[display("Missing role feature file for '{role}': {}", path.display())]
    MissingRoleFile { role: String, path: PathBuf },
    #[display("Failed to read role feature file for '{role}': {}", path.display())]
    ReadRoleFile {
        role: String,
        path: PathBuf,
        source: io::Error,
    },
    #[display("Failed to parse role feature file for '{role}': {}", path.display())]
    ParseRoleFile {
        role: String,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("Missing key '{key}' in role feature file for '{role}'")]
    MissingStrategyKey { role: String, key: String },
    #[display("Response rows for '{role}' have inconsistent widths")]
    RaggedResponses { role: String },
    #[display("Feature width mismatch for '{role}': expected {expected}, got {actual}")]
    WidthMismatch {
        role: String,
        expected: usize,
        actual: usize,
    },
    #[display("Need at least 2 responses for split-half stability: '{role}' has {count}")]
    InsufficientResponses { role: String, count: usize },
}

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum BuildBundleError {
    #[display("configuration error")]
    Config(ConfigError),
    #[display("data integrity error")]
    DataIntegrity(DataIntegrityError),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_build_error_exposes_cause_once() {
        let err = BuildBundleError::from(DataIntegrityError::InsufficientResponses {
            role: "b".to_owned(),
            count: 1,
        });
        assert_eq!(err.to_string(), "data integrity error");
        let source = err.source().map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Need at least 2 responses for split-half stability: 'b' has 1")
        );
    }
}
