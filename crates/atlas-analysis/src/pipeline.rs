//! End-to-end bundle construction
//!
//! [`build_bundle`] runs every analysis step on validated inputs:
//!
//! 1. `log(1 + x)` transform and basic filter
//! 2. Split-half stability from the raw responses
//! 3. Ranking and top-k selection
//! 4. High-D structures: feature profiles, cosine neighbor graph, role similarity
//! 5. 2D projections and neighbor-overlap quality
//! 6. Bundle assembly
//!
//! Nothing is written here. The caller serializes the returned [`Bundle`] and
//! its table only after the whole computation succeeded.

use atlas_stats::matrix::Matrix;
use tracing::info;

use crate::{
    bundle::{self, Bundle, Coords, DatasetInfo, FeatureRow, Guardrails, Neighbors},
    config::BundleConfig,
    descriptions::DescriptionCache,
    error::BuildBundleError,
    input::{RawResponseSource, RoleFeatureMatrix},
    neighbors::NeighborGraph,
    projection::{LinearProjector, NeighborEmbedding, ProjectionResult},
    quality,
    selection::{BackfillPolicy, BasicFilter, FeatureRanking, Selection},
    stability,
    statistics::ProfileInputs,
};

/// Builds the visualization bundle.
///
/// # Errors
///
/// Returns [`BuildBundleError::Config`] if the numeric options are invalid and
/// [`BuildBundleError::DataIntegrity`] if a raw response matrix is missing or
/// inconsistent with `matrix`.
pub fn build_bundle<S>(
    config: &BundleConfig,
    matrix: &RoleFeatureMatrix,
    source: &S,
    descriptions: &DescriptionCache,
) -> Result<Bundle, BuildBundleError>
where
    S: RawResponseSource + ?Sized,
{
    config.validate_parameters()?;

    let n_roles = matrix.n_roles();
    let feature_width = matrix.feature_width();
    let role_names = matrix.role_names();
    info!("Role matrix shape: {n_roles} roles x {feature_width} features");

    info!("Step 1/6: Applying log transform and basic variance filter...");
    let raw = matrix.values();
    let log_matrix = raw.map(f32::ln_1p);
    let filter = BasicFilter::from_log_matrix(&log_matrix);
    info!(
        "Basic filter retained {}/{feature_width} features (sd threshold={:.6})",
        filter.pass_count(),
        filter.sd_threshold
    );

    info!("Step 2/6: Computing split-half stability...");
    let stability =
        stability::split_half_stability(role_names, source, feature_width, config.split_seed)?;

    info!("Step 3/6: Ranking features by stability x variance...");
    let ranking = FeatureRanking::new(&filter, &stability);
    let selection = Selection::top_k(
        &ranking,
        &filter,
        config.top_k,
        BackfillPolicy::from_flag(config.backfill),
    );
    info!(
        "Selected {} features ({} back-filled)",
        selection.len(),
        selection.backfilled_count
    );

    info!("Step 4/6: Precomputing high-D structures...");
    let role_vectors = log_matrix.select_columns(&selection.indices);
    let points = role_vectors.transpose();
    let profiles = ProfileInputs {
        log_matrix: &log_matrix,
        raw_matrix: raw,
        filter: &filter,
        ranking: &ranking,
        stability: &stability,
    }
    .profiles(&selection.indices);
    let graph = NeighborGraph::cosine(&points, config.neighbor_k);
    let role_similarity = bundle::row_similarity(&role_vectors);

    info!("Step 5/6: Computing map coordinates and quality metrics...");
    let projection = project(config, &points);
    let overlap = quality::knn_overlap(&points, &projection.nonlinear, config.quality_k);
    info!(
        "kNN overlap at k={}: {:.4}",
        overlap.k_eff, overlap.score
    );

    info!("Step 6/6: Assembling bundle payload...");
    let features = profiles
        .iter()
        .enumerate()
        .map(|(row, profile)| {
            let description = u64::try_from(profile.feature_id)
                .ok()
                .and_then(|id| descriptions.get(id));
            FeatureRow::new(row, profile, role_names, description)
        })
        .collect();

    Ok(Bundle {
        dataset: DatasetInfo::new(config, n_roles, feature_width, &filter, &selection),
        guardrails: Guardrails::new(overlap),
        roles: role_names.to_vec(),
        feature_ids: selection.indices.clone(),
        coords: Coords::from(&projection),
        neighbors: Neighbors::from(&graph),
        role_similarity: role_similarity
            .iter()
            .map(|row| bundle::sanitize_all(row))
            .collect(),
        features,
    })
}

fn project(config: &BundleConfig, points: &Matrix) -> ProjectionResult {
    let embedding = NeighborEmbedding::new(
        config.embedding.n_neighbors,
        config.embedding.min_dist,
        config.embedding.random_state,
    );
    let linear = LinearProjector::new(config.random_seed);
    ProjectionResult::compute(points, &embedding, &linear)
}
