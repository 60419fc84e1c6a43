use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use atlas_analysis::{
    config::Strategy,
    error::DataIntegrityError,
    input::{self, AggregatedFeatures, RawRoleContainer},
};
use clap::Args;
use tracing::{debug, info, warn};

use crate::util::Output;

#[derive(Debug, Clone, Args)]
pub(crate) struct AggregateArg {
    /// Directory of per-role response containers (`<role>.json`)
    pub features_dir: PathBuf,

    /// Response pooling strategy (mean or max)
    #[arg(long, default_value = "mean")]
    pub strategy: Strategy,

    /// Output file path (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AggregateArg) -> anyhow::Result<()> {
    let aggregated = aggregate_dir(&arg.features_dir, arg.strategy)?;
    info!(
        "Aggregated {} roles x {} features ({})",
        aggregated.role_names.len(),
        aggregated.features.first().map_or(0, Vec::len),
        arg.strategy.as_str()
    );

    Output::save_json(&aggregated, arg.output.clone())
}

/// Pools every `<role>.json` container in `features_dir`.
///
/// Containers lacking the strategy's response array are skipped with a
/// warning. Any other read failure aborts.
fn aggregate_dir(features_dir: &Path, strategy: Strategy) -> anyhow::Result<AggregatedFeatures> {
    let mut paths = fs::read_dir(features_dir)
        .with_context(|| {
            format!(
                "Failed to read features directory: {}",
                features_dir.display()
            )
        })?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to list {}", features_dir.display()))?;
    paths.retain(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"));
    paths.sort();

    let mut roles = BTreeMap::new();
    for path in paths {
        let Some(role) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
            warn!("Skipping file with non UTF-8 name: {}", path.display());
            continue;
        };
        let container: RawRoleContainer = input::read_role_container(&role, &path)?;
        match container.into_response_matrix(&role, strategy) {
            Ok(responses) => {
                debug!("{role}: {} responses", responses.rows());
                roles.insert(role, responses);
            }
            Err(DataIntegrityError::MissingStrategyKey { key, .. }) => {
                warn!("Skipping {role}: missing key '{key}' in {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    input::aggregate_roles(&roles, strategy).with_context(|| {
        format!(
            "Failed to aggregate role files in {}",
            features_dir.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "atlas-cli-aggregate-{label}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_role_without_strategy_key_is_skipped() {
        let dir = temp_dir("skip");
        fs::write(
            dir.join("pirate.json"),
            r#"{"mean_features": [[1.0, 3.0], [3.0, 5.0]]}"#,
        )
        .unwrap();
        fs::write(dir.join("sage.json"), r#"{"max_features": [[2.0, 2.0]]}"#).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let aggregated = aggregate_dir(&dir, Strategy::Mean).unwrap();
        assert_eq!(aggregated.role_names, vec!["pirate"]);
        assert_eq!(aggregated.features, vec![vec![2.0, 4.0]]);

        let output = dir.join("out").join("per_role.json");
        let arg = AggregateArg {
            features_dir: dir.clone(),
            strategy: Strategy::Max,
            output: Some(output.clone()),
        };
        run(&arg).unwrap();
        let written: AggregatedFeatures =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.role_names, vec!["sage"]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_no_usable_roles_is_an_error() {
        let dir = temp_dir("empty");
        fs::write(dir.join("sage.json"), r#"{"max_features": [[2.0, 2.0]]}"#).unwrap();

        let err = aggregate_dir(&dir, Strategy::Mean).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataIntegrityError>(),
            Some(DataIntegrityError::NoRoles)
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_malformed_role_file_aborts() {
        let dir = temp_dir("malformed");
        fs::write(dir.join("pirate.json"), "{not json").unwrap();

        let err = aggregate_dir(&dir, Strategy::Mean).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataIntegrityError>(),
            Some(DataIntegrityError::ParseRoleFile { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
