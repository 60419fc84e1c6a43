//! 2D projections of the selected-feature space
//!
//! A [`Projector`] maps a point matrix (one row per selected feature, one
//! column per role) to one 2D coordinate per row. Implementations carry their
//! own parameters and seed and must return identical output for identical
//! input.
//!
//! Two strategies are provided:
//!
//! - [`LinearProjector`]: variance-maximizing principal-component projection
//! - [`NeighborEmbedding`]: neighbor-preserving non-linear embedding
//!
//! [`ProjectionResult`] holds one coordinate set per strategy.

pub mod embedding;
pub mod linear;

use atlas_stats::matrix::Matrix;

pub use self::{embedding::NeighborEmbedding, linear::LinearProjector};

/// Deterministic 2D embedding strategy.
pub trait Projector {
    /// Projects every row of `points` to 2D.
    fn project(&self, points: &Matrix) -> Vec<[f32; 2]>;
}

/// Coordinates of the selected features under both projection strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    pub nonlinear: Vec<[f32; 2]>,
    pub linear: Vec<[f32; 2]>,
}

impl ProjectionResult {
    /// Runs both strategies on the same points.
    #[must_use]
    pub fn compute(
        points: &Matrix,
        nonlinear: &dyn Projector,
        linear: &dyn Projector,
    ) -> Self {
        Self {
            nonlinear: nonlinear.project(points),
            linear: linear.project(points),
        }
    }
}
