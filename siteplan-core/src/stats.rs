//! Batch statistics shared by the feature, scoring and analysis stages.

/// Relative tolerance under which a value range counts as degenerate.
const DEGENERATE_RANGE_TOLERANCE: f64 = 1e-9;

/// Linearly rescale `values` onto `[0.0, 1.0]` using their own extremes.
///
/// When every value is (numerically) identical the range is degenerate and
/// every output is exactly `0.5`.
///
/// # Examples
/// ```
/// use siteplan_core::min_max_scale;
///
/// assert_eq!(min_max_scale(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
/// assert_eq!(min_max_scale(&[7.0, 7.0]), vec![0.5, 0.5]);
/// assert!(min_max_scale(&[]).is_empty());
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "min-max scaling is floating-point normalisation"
)]
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = extremes(values) else {
        return Vec::new();
    };
    let span = hi - lo;
    if span.abs() <= DEGENERATE_RANGE_TOLERANCE * lo.abs().max(hi.abs()) {
        return vec![0.5; values.len()];
    }
    values.iter().map(|v| (v - lo) / span).collect()
}

fn extremes(values: &[f64]) -> Option<(f64, f64)> {
    let (first, rest) = values.split_first()?;
    Some(
        rest.iter()
            .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Nearest-rank percentile: the value at `floor((n - 1) * p)` of the sorted
/// list. Returns `0.0` for an empty list.
///
/// # Examples
/// ```
/// use siteplan_core::percentile;
///
/// let values = [5.0, 1.0, 4.0, 2.0, 3.0];
/// assert_eq!(percentile(&values, 0.0), 1.0);
/// assert_eq!(percentile(&values, 0.65), 3.0);
/// assert_eq!(percentile(&values, 1.0), 5.0);
/// ```
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = rank_index(sorted.len(), p);
    sorted.get(idx).copied().unwrap_or(0.0)
}

/// Index `floor((len - 1) * p)` with `p` clamped into `[0, 1]`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "order-statistic rank is derived from a bounded fractional position"
)]
pub fn rank_index(len: usize, p: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let position = (len - 1) as f64 * p.clamp(0.0, 1.0);
    (position.floor() as usize).min(len - 1)
}

/// Arithmetic mean, or `0.0` for an empty list.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "mean divides a float sum by the element count"
)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[1.0, 3.0, 2.0])]
    #[case(&[-10.0, 0.0, 10.0, 5.5])]
    #[case(&[0.25, 100.0])]
    fn scaled_extremes_map_to_unit_interval(#[case] values: &[f64]) {
        let scaled = min_max_scale(values);
        let lo = scaled.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 1.0);
    }

    #[rstest]
    #[case(&[3.0])]
    #[case(&[42.0, 42.0, 42.0])]
    #[case(&[0.0, 0.0])]
    fn degenerate_range_scales_to_half(#[case] values: &[f64]) {
        let scaled = min_max_scale(values);
        assert_eq!(scaled.len(), values.len());
        assert!(scaled.iter().all(|&v| v == 0.5));
    }

    #[rstest]
    fn percentile_of_empty_list_is_zero() {
        assert_eq!(percentile(&[], 0.65), 0.0);
    }

    #[rstest]
    #[case(10, 0.85, 7)]
    #[case(1, 0.5, 0)]
    #[case(4, 1.0, 3)]
    #[case(4, 1.5, 3)]
    fn rank_index_floors_position(#[case] len: usize, #[case] p: f64, #[case] expected: usize) {
        assert_eq!(rank_index(len, p), expected);
    }

    #[rstest]
    fn mean_of_empty_list_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
    }
}
