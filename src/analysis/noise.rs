// BackgroundNoiseEstimator - aperiodic (1/f-like) floor of an EEG spectrum
//
// The spectrum is moved to dB and fitted with a low-order polynomial in
// log10(f). Each pass drops the bins that sit more than one residual standard
// deviation above the current fit (spectral peaks), then refits on what is
// left. Iteration stops once consecutive fits agree or the pass budget is
// spent.

use crate::analysis::stats::population_std;

/// Upper bound on refinement passes
pub const MAX_FIT_ITERATIONS: usize = 49;

/// RMS change (dB) between consecutive fits below which the fit is final
const CONVERGENCE_TOLERANCE_DB: f64 = 1e-6;

/// Polynomial degree of the floor model in log10(f)
const FIT_DEGREE: usize = 2;

/// Iterative regression of the background noise floor
#[derive(Debug, Clone)]
pub struct BackgroundNoiseEstimator {
    max_iterations: usize,
    tolerance_db: f64,
}

impl Default for BackgroundNoiseEstimator {
    fn default() -> Self {
        Self {
            max_iterations: MAX_FIT_ITERATIONS,
            tolerance_db: CONVERGENCE_TOLERANCE_DB,
        }
    }
}

impl BackgroundNoiseEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate the noise floor of a spectrum
    ///
    /// # Arguments
    /// * `frequencies` - Bin frequencies (Hz), already restricted to the analysis band
    /// * `powers` - Linear power per bin, same length
    ///
    /// # Returns
    /// Noise floor in `10*log10` scale, one value per bin. All NaN when the
    /// spectrum holds too few usable bins to fit.
    pub fn estimate(&self, frequencies: &[f64], powers: &[f64]) -> Vec<f64> {
        let n = frequencies.len().min(powers.len());
        let undefined = vec![f64::NAN; frequencies.len()];

        let log_freq: Vec<f64> = frequencies[..n].iter().map(|f| f.log10()).collect();
        let power_db = to_decibels(&powers[..n]);
        let usable: Vec<bool> = (0..n)
            .map(|i| log_freq[i].is_finite() && power_db[i].is_finite())
            .collect();

        let mut kept = usable.clone();
        let Some(mut coefficients) = fit_polynomial(&log_freq, &power_db, &kept) else {
            return undefined;
        };
        let mut fit = evaluate(&coefficients, &log_freq);

        for _ in 0..self.max_iterations {
            let residuals: Vec<f64> = (0..n)
                .filter(|&i| kept[i])
                .map(|i| power_db[i] - fit[i])
                .collect();
            let threshold = population_std(&residuals);

            let next_kept: Vec<bool> = (0..n)
                .map(|i| usable[i] && power_db[i] - fit[i] <= threshold)
                .collect();
            let Some(next_coefficients) = fit_polynomial(&log_freq, &power_db, &next_kept) else {
                break;
            };
            let next_fit = evaluate(&next_coefficients, &log_freq);
            let change = fitting_error(&fit, &next_fit, &usable);

            kept = next_kept;
            coefficients = next_coefficients;
            fit = next_fit;

            if change < self.tolerance_db {
                break;
            }
        }

        let mut floor = evaluate(&coefficients, &log_freq);
        for (value, &ok) in floor.iter_mut().zip(&usable) {
            if !ok {
                *value = f64::NAN;
            }
        }
        floor.resize(frequencies.len(), f64::NAN);
        floor
    }
}

/// `10*log10` of each power; non-positive powers become NaN
pub fn to_decibels(powers: &[f64]) -> Vec<f64> {
    powers
        .iter()
        .map(|&p| if p > 0.0 { 10.0 * p.log10() } else { f64::NAN })
        .collect()
}

/// RMS difference between two fits over the usable bins
fn fitting_error(previous: &[f64], current: &[f64], usable: &[bool]) -> f64 {
    let (sum, count) = previous
        .iter()
        .zip(current)
        .zip(usable)
        .filter(|(_, ok)| **ok)
        .fold((0.0, 0usize), |(s, c), ((a, b), _)| (s + (a - b) * (a - b), c + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}

/// Coefficients (constant term first) evaluated at each abscissa
fn evaluate(coefficients: &[f64], x: &[f64]) -> Vec<f64> {
    x.iter()
        .map(|&xi| coefficients.iter().rev().fold(0.0, |acc, c| acc * xi + c))
        .collect()
}

/// Least-squares polynomial of degree `FIT_DEGREE` on the masked points
///
/// Returns `None` when fewer points than coefficients are selected or the
/// normal equations are singular.
fn fit_polynomial(x: &[f64], y: &[f64], mask: &[bool]) -> Option<Vec<f64>> {
    const SIZE: usize = FIT_DEGREE + 1;
    let points = mask.iter().filter(|&&m| m).count();
    if points < SIZE {
        return None;
    }

    let mut normal = [[0.0; SIZE]; SIZE];
    let mut rhs = [0.0; SIZE];
    for i in (0..x.len()).filter(|&i| mask[i]) {
        let mut powers = [1.0; SIZE];
        for k in 1..SIZE {
            powers[k] = powers[k - 1] * x[i];
        }
        for row in 0..SIZE {
            rhs[row] += powers[row] * y[i];
            for col in 0..SIZE {
                normal[row][col] += powers[row] * powers[col];
            }
        }
    }

    solve_linear(normal, rhs).map(|c| c.to_vec())
}

/// Gaussian elimination with partial pivoting
fn solve_linear<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = [0.0; N];
    for row in (0..N).rev() {
        let tail: f64 = (row + 1..N).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    solution.iter().all(|v| v.is_finite()).then_some(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> Vec<f64> {
        (5..=60).map(|k| k as f64 * 0.5).collect()
    }

    #[test]
    fn test_pure_power_law_is_recovered() {
        let freqs = axis();
        let powers: Vec<f64> = freqs.iter().map(|f| 100.0 / f).collect();
        let floor = BackgroundNoiseEstimator::new().estimate(&freqs, &powers);

        for (db, p) in floor.iter().zip(to_decibels(&powers)) {
            assert!((db - p).abs() < 1e-6, "floor {} vs power {}", db, p);
        }
    }

    #[test]
    fn test_peak_is_excluded_from_floor() {
        let freqs = axis();
        let powers: Vec<f64> = freqs
            .iter()
            .map(|&f| {
                let background = 100.0 / f;
                let bump = 50.0 * (-(f - 10.0) * (f - 10.0) / 2.0).exp();
                background + bump
            })
            .collect();
        let floor = BackgroundNoiseEstimator::new().estimate(&freqs, &powers);
        let power_db = to_decibels(&powers);

        let peak = freqs.iter().position(|&f| f == 10.0).unwrap();
        assert!(
            power_db[peak] - floor[peak] > 3.0,
            "Peak should stand above the floor: {} vs {}",
            power_db[peak],
            floor[peak]
        );
        let far = freqs.iter().position(|&f| f == 25.0).unwrap();
        assert!((power_db[far] - floor[far]).abs() < 2.0);
    }

    #[test]
    fn test_all_nan_spectrum_gives_all_nan_floor() {
        let freqs = axis();
        let powers = vec![f64::NAN; freqs.len()];
        let floor = BackgroundNoiseEstimator::new().estimate(&freqs, &powers);
        assert_eq!(floor.len(), freqs.len());
        assert!(floor.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_output_length_matches_input() {
        let freqs = axis();
        let powers: Vec<f64> = freqs.iter().map(|f| 1.0 / (f * f)).collect();
        let floor = BackgroundNoiseEstimator::new().estimate(&freqs, &powers);
        assert_eq!(floor.len(), freqs.len());
    }
}
