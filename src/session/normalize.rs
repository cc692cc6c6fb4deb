// Normalizer - z-score of a session value against the calibration history

use crate::analysis::stats::{mean, sample_std};

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// `(value - mean(history)) / std(history)`
    ///
    /// The division is skipped when the standard deviation is zero. An empty
    /// history yields the `+inf` failure sentinel.
    pub fn normalize(&self, value: f64, history: &[f64]) -> f64 {
        if history.is_empty() {
            return f64::INFINITY;
        }
        let centred = value - mean(history);
        let spread = sample_std(history);
        if spread == 0.0 {
            centred
        } else {
            centred / spread
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_score() {
        let normalizer = Normalizer::new();
        let z = normalizer.normalize(12.0, &[8.0, 10.0, 12.0]);
        assert!((z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_spread_skips_division() {
        assert_eq!(Normalizer::new().normalize(7.0, &[5.0, 5.0]), 2.0);
        assert_eq!(Normalizer::new().normalize(7.0, &[5.0]), 2.0);
    }

    #[test]
    fn test_empty_history_sentinel() {
        assert_eq!(Normalizer::new().normalize(1.0, &[]), f64::INFINITY);
    }
}
