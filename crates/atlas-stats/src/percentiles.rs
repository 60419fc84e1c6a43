/// Computes the median of unsorted values.
///
/// For an even number of values the two middle values are averaged.
///
/// # Returns
///
/// * `Some(median)` - if the dataset contains at least one value
/// * `None` - if the dataset is empty
///
/// # Examples
///
/// ```
/// use atlas_stats::percentiles::median;
///
/// assert_eq!(median([5.0, 1.0, 3.0]), Some(3.0));
/// assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
/// assert_eq!(median([]), None);
/// ```
#[must_use]
pub fn median<I>(values: I) -> Option<f32>
where
    I: IntoIterator<Item = f32>,
{
    let mut values = values.into_iter().collect::<Vec<_>>();
    values.sort_by(f32::total_cmp);
    median_from_sorted(&values)
}

/// Computes the median of values sorted in ascending order.
///
/// # Panics
///
/// Panics if `sorted_values` is not sorted in ascending order.
#[must_use]
pub fn median_from_sorted(sorted_values: &[f32]) -> Option<f32> {
    assert!(
        sorted_values.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );

    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted_values[mid])
    } else {
        Some(f32::midpoint(sorted_values[mid - 1], sorted_values[mid]))
    }
}
