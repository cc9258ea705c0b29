//! Statistics primitives
//!
//! Plain functions over numeric slices. All of them are total: empty input,
//! zero variance and mismatched lengths resolve to `0.0` instead of NaN.

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Standardised distance from the mean; `0.0` when `std_dev` is not positive.
pub fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        (value - mean) / std_dev
    } else {
        0.0
    }
}

/// Ordinary least squares fit, returned as `(slope, intercept)`.
///
/// Returns `(0.0, 0.0)` for fewer than two points, mismatched lengths or
/// a degenerate x range.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    if xs.len() != ys.len() || xs.len() < 2 {
        return (0.0, 0.0);
    }

    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (0.0, 0.0);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

/// Regression of `values` against their positions `0, 1, 2, ...`
pub fn index_regression(values: &[f64]) -> (f64, f64) {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    linear_regression(&xs, values)
}

/// Mean of up to `window` values on each side of `index`, excluding it.
///
/// Returns `0.0` when there are no neighbours.
pub fn expected_value(values: &[f64], index: usize, window: usize) -> f64 {
    if index >= values.len() {
        return 0.0;
    }
    let start = index.saturating_sub(window);
    let end = (index + window + 1).min(values.len());

    let neighbours: Vec<f64> = values[start..index]
        .iter()
        .chain(&values[index + 1..end])
        .copied()
        .collect();

    mean(&neighbours)
}

/// Pearson correlation coefficient of two paired series.
///
/// Returns `0.0` for fewer than three pairs, mismatched lengths or a series
/// with no variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 3 {
        return 0.0;
    }

    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();
    let sum_y2: f64 = ys.iter().map(|y| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Verbal strength of a correlation coefficient
pub fn correlation_strength(coefficient: f64) -> &'static str {
    let magnitude = coefficient.abs();
    if magnitude > 0.8 {
        "Very Strong"
    } else if magnitude > 0.6 {
        "Strong"
    } else if magnitude > 0.4 {
        "Moderate"
    } else if magnitude > 0.2 {
        "Weak"
    } else {
        "Very Weak"
    }
}

/// Relative change from `from` to `to` in percent; `0.0` when `from` is zero.
pub fn percentage_change(from: f64, to: f64) -> f64 {
    if from != 0.0 {
        (to - from) / from * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn std_dev_uses_population_variance() {
        // population sd of [2,4,4,4,5,5,7,9] is exactly 2; sample sd would be ~2.14
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx(std_dev(&values), 2.0));
    }

    #[test]
    fn std_dev_of_constant_series_is_zero() {
        assert_eq!(std_dev(&[7.0; 10]), 0.0);
    }

    #[test]
    fn z_score_guards_zero_std_dev() {
        assert_eq!(z_score(100.0, 5.0, 0.0), 0.0);
    }

    #[test]
    fn z_score_is_antisymmetric_around_mean() {
        let (m, sd, d) = (50.0, 4.0, 6.0);
        assert!(approx(z_score(m + d, m, sd), -z_score(m - d, m, sd)));
    }

    #[test]
    fn linear_regression_on_unit_line() {
        let (slope, intercept) = linear_regression(&[0.0, 1.0, 2.0, 3.0], &[1.0, 2.0, 3.0, 4.0]);
        assert!(approx(slope, 1.0));
        assert!(approx(intercept, 1.0));
    }

    #[test]
    fn linear_regression_rejects_short_or_mismatched_input() {
        assert_eq!(linear_regression(&[1.0], &[1.0]), (0.0, 0.0));
        assert_eq!(linear_regression(&[1.0, 2.0], &[1.0]), (0.0, 0.0));
    }

    #[test]
    fn linear_regression_with_constant_x_is_zero() {
        assert_eq!(linear_regression(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), (0.0, 0.0));
    }

    #[test]
    fn pearson_is_one_for_perfectly_linked_series() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let rising = [10.0, 20.0, 30.0, 40.0, 50.0];
        let falling = [50.0, 40.0, 30.0, 20.0, 10.0];
        assert!(approx(pearson_correlation(&xs, &rising), 1.0));
        assert!(approx(pearson_correlation(&xs, &falling), -1.0));
    }

    #[test]
    fn pearson_needs_three_pairs() {
        assert_eq!(pearson_correlation(&[1.0, 2.0], &[2.0, 4.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0]), 0.0);
    }

    #[test]
    fn pearson_of_constant_series_is_zero() {
        assert_eq!(pearson_correlation(&[1.0, 2.0, 3.0, 4.0], &[7.0; 4]), 0.0);
    }

    #[test]
    fn correlation_strength_buckets() {
        assert_eq!(correlation_strength(0.81), "Very Strong");
        assert_eq!(correlation_strength(-0.8), "Strong");
        assert_eq!(correlation_strength(0.5), "Moderate");
        assert_eq!(correlation_strength(-0.3), "Weak");
        assert_eq!(correlation_strength(0.2), "Very Weak");
    }

    #[test]
    fn expected_value_uses_three_neighbours_each_side() {
        let values = [100.0, 102.0, 98.0, 101.0, 99.0, 250.0, 103.0];
        // 98, 101, 99 before and only 103 after
        assert!(approx(expected_value(&values, 5, 3), 100.25));
    }

    #[test]
    fn expected_value_at_first_index_only_looks_forward() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert!(approx(expected_value(&values, 0, 3), 30.0));
    }

    #[test]
    fn expected_value_without_neighbours_is_zero() {
        assert_eq!(expected_value(&[42.0], 0, 3), 0.0);
        assert_eq!(expected_value(&[1.0, 2.0], 5, 3), 0.0);
    }

    #[test]
    fn percentage_change_from_zero_is_zero() {
        assert_eq!(percentage_change(0.0, 100.0), 0.0);
        assert!(approx(percentage_change(200.0, 150.0), -25.0));
    }
}
