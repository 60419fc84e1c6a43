use crate::matrix::Matrix;

/// Column-wise descriptive statistics.
///
/// Summarizes one column of a [`Matrix`] (one feature across all roles).
/// Standard deviation is the population form (divides by `n`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    /// The arithmetic mean of the column.
    pub mean: f32,
    /// The population standard deviation of the column.
    pub std_dev: f32,
    /// The minimum value in the column.
    pub min: f32,
    /// The maximum value in the column.
    pub max: f32,
}

impl ColumnStats {
    /// Computes statistics for every column of `matrix`.
    ///
    /// The reduction walks the matrix row by row and accumulates into per-column
    /// buffers, so wide matrices are traversed in storage order.
    ///
    /// Returns an empty vector if the matrix has no rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use atlas_stats::{descriptive::ColumnStats, matrix::Matrix};
    ///
    /// let m = Matrix::from_rows(&[vec![1.0, 0.0], vec![3.0, 0.0]]).unwrap();
    /// let stats = ColumnStats::from_matrix(&m);
    /// assert_eq!(stats[0].mean, 2.0);
    /// assert_eq!(stats[0].std_dev, 1.0);
    /// assert_eq!(stats[1].std_dev, 0.0);
    /// ```
    #[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_matrix(matrix: &Matrix) -> Vec<Self> {
        let (rows, cols) = matrix.shape();
        if rows == 0 {
            return vec![];
        }
        let n = rows as f64;

        let mut sum = vec![0.0_f64; cols];
        let mut min = vec![f32::INFINITY; cols];
        let mut max = vec![f32::NEG_INFINITY; cols];
        for row in matrix.iter_rows() {
            for (c, &v) in row.iter().enumerate() {
                sum[c] += f64::from(v);
                min[c] = min[c].min(v);
                max[c] = max[c].max(v);
            }
        }
        let mean = sum.iter().map(|s| s / n).collect::<Vec<_>>();

        let mut sq_dev = vec![0.0_f64; cols];
        for row in matrix.iter_rows() {
            for (c, &v) in row.iter().enumerate() {
                sq_dev[c] += (f64::from(v) - mean[c]).powi(2);
            }
        }

        (0..cols)
            .map(|c| Self {
                mean: mean[c] as f32,
                std_dev: (sq_dev[c] / n).sqrt() as f32,
                min: min[c],
                max: max[c],
            })
            .collect()
    }
}

/// Column means of `matrix`, or an empty vector when it has no rows.
#[must_use]
pub fn column_means(matrix: &Matrix) -> Vec<f32> {
    ColumnStats::from_matrix(matrix)
        .into_iter()
        .map(|s| s.mean)
        .collect()
}
