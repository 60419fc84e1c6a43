//! Visualization bundle command
//!
//! Resolves the configuration (JSON file, then flag overrides), validates it,
//! runs the analysis pipeline, and writes `bundle.json` and `features.csv`
//! into `<output_dir>/<dataset_name>/`. Both outputs are rendered in memory
//! first; nothing is written unless the whole run succeeds.

use std::path::PathBuf;

use anyhow::Context;
use atlas_analysis::{
    config::{BundleConfig, Strategy},
    descriptions::DescriptionCache,
    input::{AggregatedFeatures, RawResponseDir, RoleFeatureMatrix},
    pipeline, table,
};
use clap::Args;
use tracing::info;

use crate::util;

#[derive(Debug, Clone, Default, Args)]
pub(crate) struct BuildBundleArg {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Aggregated role x feature container
    #[arg(long)]
    pub aggregated_file: Option<PathBuf>,

    /// Directory of per-role response containers
    #[arg(long)]
    pub features_dir: Option<PathBuf>,

    /// Output root directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Response pooling strategy (mean or max)
    #[arg(long)]
    pub strategy: Option<Strategy>,

    /// Number of features to select
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Seed of the linear projection
    #[arg(long)]
    pub random_seed: Option<u64>,

    /// Seed of the split-half partition
    #[arg(long)]
    pub split_seed: Option<u64>,

    /// Neighborhood size of the non-linear embedding
    #[arg(long)]
    pub n_neighbors: Option<usize>,

    /// Minimum distance of the non-linear embedding
    #[arg(long)]
    pub min_dist: Option<f32>,

    /// Seed of the non-linear embedding
    #[arg(long)]
    pub random_state: Option<u64>,

    /// Width of the high-D neighbor graph
    #[arg(long)]
    pub neighbor_k: Option<usize>,

    /// Neighborhood size of the overlap quality check
    #[arg(long)]
    pub quality_k: Option<usize>,

    /// Pre-fetched feature description cache
    #[arg(long)]
    pub description_cache: Option<PathBuf>,

    /// Name of the dataset output subdirectory
    #[arg(long)]
    pub dataset_name: Option<String>,

    /// Keep only features passing the basic filter instead of back-filling
    #[arg(long)]
    pub no_backfill: bool,
}

impl BuildBundleArg {
    fn resolve_config(&self) -> anyhow::Result<BundleConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file::<BundleConfig, _>("config", path)?,
            None => BundleConfig::default(),
        };
        let embedding = &mut config.embedding;
        override_with(&mut embedding.n_neighbors, self.n_neighbors);
        override_with(&mut embedding.min_dist, self.min_dist);
        override_with(&mut embedding.random_state, self.random_state);
        override_with(&mut config.aggregated_file, self.aggregated_file.clone());
        override_with(&mut config.features_dir, self.features_dir.clone());
        override_with(&mut config.output_dir, self.output_dir.clone());
        override_with(&mut config.strategy, self.strategy);
        override_with(&mut config.top_k, self.top_k);
        override_with(&mut config.random_seed, self.random_seed);
        override_with(&mut config.split_seed, self.split_seed);
        override_with(&mut config.neighbor_k, self.neighbor_k);
        override_with(&mut config.quality_k, self.quality_k);
        override_with(&mut config.dataset_name, self.dataset_name.clone());
        if self.description_cache.is_some() {
            config.description_cache.clone_from(&self.description_cache);
        }
        if self.no_backfill {
            config.backfill = false;
        }
        Ok(config)
    }
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

pub(crate) fn run(arg: &BuildBundleArg) -> anyhow::Result<()> {
    let config = arg.resolve_config()?;
    config.validate().context("Invalid configuration")?;

    info!("Loading aggregated role-level data...");
    let aggregated =
        util::read_json_file::<AggregatedFeatures, _>("aggregated", &config.aggregated_file)?;
    let matrix = RoleFeatureMatrix::try_from(aggregated).with_context(|| {
        format!(
            "Invalid aggregated file: {}",
            config.aggregated_file.display()
        )
    })?;
    let source = RawResponseDir::new(&config.features_dir, config.strategy);
    let descriptions = config
        .description_cache
        .as_deref()
        .map_or_else(DescriptionCache::empty, DescriptionCache::load);

    let bundle = pipeline::build_bundle(&config, &matrix, &source, &descriptions)
        .context("Failed to build visualization bundle")?;

    let bundle_json = util::to_json_string("bundle", &bundle)?;
    let features_csv = table::to_csv(&bundle.features).context("Failed to render feature table")?;

    let dataset_dir = config.dataset_dir();
    let bundle_file = dataset_dir.join("bundle.json");
    let summary_csv = dataset_dir.join("features.csv");
    util::write_outputs(
        &dataset_dir,
        &[
            (bundle_file.as_path(), bundle_json.as_str()),
            (summary_csv.as_path(), features_csv.as_str()),
        ],
    )?;

    info!("Saved bundle: {}", bundle_file.display());
    info!("Saved feature table: {}", summary_csv.display());
    Ok(())
}
