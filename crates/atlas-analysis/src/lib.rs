//! Offline feature analysis for persona activation atlases
//!
//! This crate reduces a role x feature activation matrix into a curated
//! visualization bundle: a stable subset of features, their per-role
//! statistics, a 2D layout, and neighbor structure.
//!
//! # Overview
//!
//! ## Bundle Workflow
//!
//! [`pipeline::build_bundle`] runs the whole reduction:
//!
//! 1. **Load Inputs** ([`input::RoleFeatureMatrix`], [`input::RawResponseSource`]):
//!    Aggregated matrix and per-role raw responses
//! 2. **Basic Filter** ([`selection::BasicFilter`]): Alive and variance gate on
//!    `log(1 + x)` values
//! 3. **Stability** ([`stability::split_half_stability`]): Split-half
//!    reproducibility of each feature's role profile
//! 4. **Selection** ([`selection::Selection`]): Top-k by `stability × sd` with
//!    deterministic tie-breaks
//! 5. **High-D Structure** ([`neighbors::NeighborGraph`], [`statistics`]):
//!    Cosine neighbor graph and per-feature statistics
//! 6. **Projection** ([`projection`]): Non-linear and linear 2D views, checked by
//!    [`quality::knn_overlap`]
//! 7. **Assembly** ([`bundle::Bundle`], [`table`]): JSON document and CSV table
//!
//! ## Aggregation Workflow
//!
//! [`input::aggregate_roles`] pools per-role raw responses (mean or max) into
//! the aggregated container consumed by the bundle workflow.
//!
//! # Determinism
//!
//! Every random step takes an explicit seed from [`config::BundleConfig`],
//! every ordering breaks ties by index, and every output float is rounded to
//! six decimals. Identical inputs and seeds produce identical bundles.
//!
//! # Examples
//!
//! ```
//! use atlas_analysis::{
//!     config::BundleConfig,
//!     descriptions::DescriptionCache,
//!     input::{InMemoryResponses, RoleFeatureMatrix},
//!     pipeline,
//! };
//! use atlas_stats::matrix::Matrix;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let values = Matrix::from_rows(&[vec![1.0, 0.0, 5.0], vec![0.0, 2.0, 3.0]]).unwrap();
//! let matrix = RoleFeatureMatrix::new(vec!["a".into(), "b".into()], values)?;
//!
//! let mut responses = InMemoryResponses::new();
//! responses.insert("a", Matrix::from_rows(&[vec![1.0, 0.0, 5.0], vec![1.0, 0.0, 4.0]]).unwrap());
//! responses.insert("b", Matrix::from_rows(&[vec![0.0, 2.0, 3.0], vec![0.0, 1.0, 3.0]]).unwrap());
//!
//! let config = BundleConfig { top_k: 2, ..BundleConfig::default() };
//! let bundle = pipeline::build_bundle(&config, &matrix, &responses, &DescriptionCache::empty())?;
//! assert_eq!(bundle.feature_ids.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod descriptions;
pub mod error;
pub mod input;
pub mod neighbors;
pub mod pipeline;
pub mod projection;
pub mod quality;
pub mod selection;
pub mod stability;
pub mod statistics;
pub mod table;
