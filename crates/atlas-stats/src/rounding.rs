//! Output float sanitation
//!
//! Values written to bundles are rounded to a fixed number of decimals and
//! non-finite values are replaced by zero, so repeated runs serialize to the
//! same bytes.

/// Number of decimals kept by [`sanitize`].
pub const DECIMALS: i32 = 6;

/// Rounds `value` to [`DECIMALS`] decimals, mapping NaN and infinities to `0.0`.
///
/// Negative zero is normalized to `0.0`.
///
/// # Examples
///
/// ```
/// use atlas_stats::rounding::sanitize;
///
/// assert_eq!(sanitize(0.1234567), 0.123457);
/// assert_eq!(sanitize(f32::NAN), 0.0);
/// assert_eq!(sanitize(f32::NEG_INFINITY), 0.0);
/// ```
#[must_use]
pub fn sanitize(value: f32) -> f64 {
    sanitize_f64(f64::from(value))
}

/// [`sanitize`] for `f64` inputs.
#[must_use]
pub fn sanitize_f64(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scale = 10_f64.powi(DECIMALS);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 { 0.0 } else { rounded }
}
