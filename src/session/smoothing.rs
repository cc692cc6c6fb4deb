// Smoother - trailing moving average over a relax-index history

use crate::analysis::stats::mean;

/// Exact arithmetic mean of the most recent values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Smoother {
    duration: usize,
}

impl Smoother {
    /// Create a smoother averaging the last `duration` values (at least 1)
    pub fn new(duration: usize) -> Self {
        Self {
            duration: duration.max(1),
        }
    }

    pub fn duration(&self) -> usize {
        self.duration
    }

    /// Mean of the last `min(duration, len)` values; NaN for an empty history
    pub fn smooth(&self, history: &[f64]) -> f64 {
        let start = history.len().saturating_sub(self.duration);
        mean(&history[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_mean() {
        let smoother = Smoother::new(2);
        assert_eq!(smoother.smooth(&[1.0]), 1.0);
        assert_eq!(smoother.smooth(&[1.0, 3.0]), 2.0);
        assert_eq!(smoother.smooth(&[1.0, 3.0, 5.0]), 4.0);
    }

    #[test]
    fn test_duration_longer_than_history() {
        let smoother = Smoother::new(10);
        assert_eq!(smoother.smooth(&[2.0, 4.0, 6.0]), 4.0);
    }

    #[test]
    fn test_zero_duration_clamped() {
        let smoother = Smoother::new(0);
        assert_eq!(smoother.duration(), 1);
        assert_eq!(smoother.smooth(&[2.0, 4.0]), 4.0);
    }

    #[test]
    fn test_empty_history() {
        assert!(Smoother::new(3).smooth(&[]).is_nan());
    }
}
