// Numeric helpers shared by the spectral and session stages

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N - 1 denominator), 0 for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mu) * (v - mu)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation, 0 for an empty slice
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mu) * (v - mu)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Mean of the finite entries, NaN when there are none
pub fn finite_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Trapezoidal integral of `y` over the abscissa `x`
pub fn trapz(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}

/// Numerical derivative: central differences inside, one-sided at the edges
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    0.5 * (values[i + 1] - values[i - 1])
                }
            })
            .collect(),
    }
}

pub fn all_nan(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert!((population_std(&values) - 2.0).abs() < 1e-12);
        assert!((sample_std(&values) - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[3.0]), 0.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_finite_mean_skips_non_finite() {
        assert_eq!(finite_mean([1.0, f64::NAN, 3.0, f64::INFINITY]), 2.0);
        assert!(finite_mean([f64::NAN]).is_nan());
    }

    #[test]
    fn test_trapz_linear() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 1.0, 2.0];
        assert!((trapz(&x, &y) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_central_differences() {
        let values = [1.0, 2.0, 4.0, 7.0, 11.0];
        assert_eq!(gradient(&values), vec![1.0, 1.5, 2.5, 3.5, 4.0]);
    }
}
