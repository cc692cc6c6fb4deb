// FrequencyBand - closed frequency interval in Hz
//
// Bands are used both for filtering (band-pass corners) and for slicing a
// spectrum. Slicing follows the strict-bounds convention used throughout the
// IAF detector: the first bin strictly above `low_hz` up to the last bin
// strictly below `high_hz`.

use serde::{Deserialize, Serialize};

/// Closed frequency interval `[low_hz, high_hz]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    /// Alpha band used when no individual peak could be established
    pub const DEFAULT_ALPHA: FrequencyBand = FrequencyBand::new(7.0, 13.0);
    /// Band searched for the individual alpha peak
    pub const SEARCH: FrequencyBand = FrequencyBand::new(6.0, 13.0);
    /// Band kept for spectral analysis
    pub const ANALYSIS: FrequencyBand = FrequencyBand::new(2.0, 30.0);
    /// Guard band below alpha, used for the quality factor
    pub const GUARD_LOW: FrequencyBand = FrequencyBand::new(3.0, 6.5);
    /// Guard band above alpha, used for the quality factor
    pub const GUARD_HIGH: FrequencyBand = FrequencyBand::new(13.5, 18.5);

    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// Band of `half_width` Hz on each side of `center_hz`
    pub fn around(center_hz: f64, half_width: f64) -> Self {
        Self::new(center_hz - half_width, center_hz + half_width)
    }

    pub fn center(&self) -> f64 {
        0.5 * (self.low_hz + self.high_hz)
    }

    pub fn contains(&self, frequency_hz: f64) -> bool {
        frequency_hz >= self.low_hz && frequency_hz <= self.high_hz
    }

    /// Both edges finite and ordered
    pub fn is_valid(&self) -> bool {
        self.low_hz.is_finite() && self.high_hz.is_finite() && self.low_hz < self.high_hz
    }

    /// Band widened by `margin_hz` on both sides
    pub fn widened(&self, margin_hz: f64) -> Self {
        Self::new(self.low_hz - margin_hz, self.high_hz + margin_hz)
    }

    /// Index range of `frequencies` lying strictly inside the band
    ///
    /// # Returns
    /// `Some((first, last))` with `frequencies[first] > low_hz` and
    /// `frequencies[last] < high_hz`, or `None` when no bin qualifies.
    pub fn index_bounds(&self, frequencies: &[f64]) -> Option<(usize, usize)> {
        let first = frequencies.iter().position(|&f| f > self.low_hz)?;
        let last = frequencies.iter().rposition(|&f| f < self.high_hz)?;
        (first <= last).then_some((first, last))
    }
}
