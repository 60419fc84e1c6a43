/// Normalized Shannon entropy of a non-negative mass distribution.
///
/// Negative values are clipped to zero before normalizing to probabilities.
/// The entropy is divided by `ln(n)` so the result lies in `[0, 1]`, where
/// `0` means all mass sits on one entry and `1` means mass is spread evenly.
///
/// Returns `0.0` if the total mass is not positive. With a single entry the
/// raw entropy is returned unnormalized (always `0.0`).
///
/// # Examples
///
/// ```
/// use atlas_stats::entropy::normalized_entropy;
///
/// assert_eq!(normalized_entropy(&[5.0, 0.0, 0.0]), 0.0);
/// assert!((normalized_entropy(&[1.0, 1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(normalized_entropy(&[0.0, 0.0]), 0.0);
/// ```
#[expect(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[must_use]
pub fn normalized_entropy(values: &[f32]) -> f32 {
    let total = values.iter().map(|&v| f64::from(v.max(0.0))).sum::<f64>();
    if total <= 0.0 {
        return 0.0;
    }
    let entropy = -values
        .iter()
        .map(|&v| f64::from(v.max(0.0)) / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>();
    let n = values.len();
    let entropy = if n > 1 {
        entropy / (n as f64).ln()
    } else {
        entropy
    };
    entropy as f32
}
