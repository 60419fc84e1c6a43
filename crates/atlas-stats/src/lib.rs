//! Numeric utilities for the persona atlas project.
//!
//! This crate provides the small set of dense-matrix and statistical tools the
//! analysis pipeline is built on:
//!
//! - **Matrices**: Row-major `f32` matrices with row views and column selection
//! - **Descriptive statistics**: Column-wise mean, standard deviation, min and max
//! - **Percentiles**: Median with even-count averaging
//! - **Vectors**: Dot products, norms, cosine similarity, Euclidean distance
//! - **Entropy**: Normalized Shannon entropy of a mass distribution
//! - **Rounding**: Fixed-decimal sanitation of output floats
//!
//! # Modules
//!
//! - [`matrix`]: Dense matrix storage
//! - [`descriptive`]: Column-wise summaries across rows
//! - [`percentiles`]: Median computation
//! - [`vector`]: Slice-level vector arithmetic
//! - [`entropy`]: Distribution spread measures
//! - [`rounding`]: Serialization-ready float values
//!
//! # Examples
//!
//! ## Summarizing feature columns
//!
//! ```
//! use atlas_stats::{descriptive::ColumnStats, matrix::Matrix};
//!
//! let m = Matrix::from_rows(&[vec![1.0, 5.0], vec![3.0, 5.0]]).unwrap();
//! let stats = ColumnStats::from_matrix(&m);
//! assert_eq!(stats[0].mean, 2.0);
//! assert_eq!(stats[1].std_dev, 0.0);
//! ```
//!
//! ## Comparing vectors
//!
//! ```
//! use atlas_stats::vector::cosine_similarity;
//!
//! let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
//! assert!((sim - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
//! ```

pub mod descriptive;
pub mod entropy;
pub mod matrix;
pub mod percentiles;
pub mod rounding;
pub mod vector;
