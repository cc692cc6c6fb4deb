// SessionAlphaStats - running mean alpha power for one session
//
// Every call is counted; only calls where some channel has perfect quality
// contribute their alpha power. The confidence is the share of calls that
// contributed.

/// Quality a channel must reach for its packet to count
const TRUSTED_QUALITY: f64 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionAlphaStats {
    sum: f64,
    accumulated: usize,
    calls: usize,
}

impl SessionAlphaStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one packet's alpha power with its per-channel qualities
    pub fn record(&mut self, alpha_power: f64, qualities: &[f64]) {
        self.calls += 1;
        if alpha_power.is_finite() && qualities.iter().any(|&q| q == TRUSTED_QUALITY) {
            self.sum += alpha_power;
            self.accumulated += 1;
        }
    }

    /// Mean of the accumulated alpha power, NaN when nothing was accumulated
    pub fn mean_alpha_power(&self) -> f64 {
        if self.accumulated == 0 {
            f64::NAN
        } else {
            self.sum / self.accumulated as f64
        }
    }

    /// Fraction of recorded packets that contributed, 0 before any call
    pub fn confidence(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.accumulated as f64 / self.calls as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_trusted_packets_accumulate() {
        let mut stats = SessionAlphaStats::new();
        stats.record(4.0, &[1.0, 0.5]);
        stats.record(100.0, &[0.5, 0.5]);
        stats.record(6.0, &[0.0, 1.0]);
        stats.record(8.0, &[0.0, 0.0]);

        assert_eq!(stats.mean_alpha_power(), 5.0);
        assert_eq!(stats.confidence(), 0.5);
    }

    #[test]
    fn test_empty_and_reset() {
        let mut stats = SessionAlphaStats::new();
        assert!(stats.mean_alpha_power().is_nan());
        assert_eq!(stats.confidence(), 0.0);

        stats.record(3.0, &[1.0]);
        stats.reset();
        assert_eq!(stats, SessionAlphaStats::new());
    }
}
