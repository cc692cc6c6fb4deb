// ChannelCombiner - merge per-channel estimates into one value
//
// When every channel carries a numeric quality factor the values are
// averaged with their qualities as weights. Otherwise the channels are
// classified good/bad (RMS: value > 1 micro-volt, IAF: value present) and:
// - no good channel: RMS is 1.0, IAF falls back to the default alpha band
// - one good channel: its value is used
// - several good channels: RMS is the plain mean of the good values,
//   IAF falls back to the default alpha band

use crate::analysis::band::FrequencyBand;

/// RMS values at or below this (micro-volts) are treated as flat/bad channels
const GOOD_RMS_THRESHOLD: f64 = 1.0;

/// Combined RMS reported when no channel is usable
const DEFAULT_RMS: f64 = 1.0;

/// Half-width (Hz) of the band built around a combined IAF
const IAF_HALF_WIDTH_HZ: f64 = 1.0;

/// How the per-channel values combine before interpretation
#[derive(Debug, Clone, Copy, PartialEq)]
enum Combination {
    Weighted(f64),
    SingleGood(f64),
    NoneGood,
    SeveralGood(f64),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelCombiner;

impl ChannelCombiner {
    pub fn new() -> Self {
        Self
    }

    fn combine(values: &[f64], qualities: &[f64], is_good: impl Fn(f64) -> bool) -> Combination {
        let all_weighted = !qualities.is_empty()
            && qualities.len() == values.len()
            && qualities.iter().all(|q| !q.is_nan());
        if all_weighted {
            let total: f64 = qualities.iter().sum();
            let weighted: f64 = values.iter().zip(qualities).map(|(v, q)| v * q).sum::<f64>() / total;
            if total > 0.0 && weighted.is_finite() {
                return Combination::Weighted(weighted);
            }
            let plain = values.iter().sum::<f64>() / values.len() as f64;
            if plain.is_finite() {
                return Combination::Weighted(plain);
            }
        }

        let good: Vec<f64> = values.iter().copied().filter(|&v| is_good(v)).collect();
        match good.as_slice() {
            [] => Combination::NoneGood,
            [only] => Combination::SingleGood(*only),
            many => Combination::SeveralGood(many.iter().sum::<f64>() / many.len() as f64),
        }
    }

    /// Combine per-channel alpha RMS values
    ///
    /// # Arguments
    /// * `values` - RMS per channel (micro-volts)
    /// * `qualities` - Guard-band quality factor per channel, NaN when unknown
    ///
    /// # Returns
    /// Combined RMS, 1.0 when no channel is usable
    pub fn combine_band_power(&self, values: &[f64], qualities: &[f64]) -> f64 {
        match Self::combine(values, qualities, |v| v > GOOD_RMS_THRESHOLD) {
            Combination::Weighted(v) | Combination::SingleGood(v) | Combination::SeveralGood(v) => v,
            Combination::NoneGood => DEFAULT_RMS,
        }
    }

    /// Combine per-channel peak frequencies into an alpha band
    ///
    /// # Returns
    /// `[iaf - 1, iaf + 1]` around the combined peak, or the default alpha
    /// band when no channel or several disagreeing channels carry a peak
    pub fn combine_peak_frequency(&self, values: &[f64], qualities: &[f64]) -> FrequencyBand {
        match Self::combine(values, qualities, |v| !v.is_nan()) {
            Combination::Weighted(iaf) | Combination::SingleGood(iaf) => {
                FrequencyBand::around(iaf, IAF_HALF_WIDTH_HZ)
            }
            Combination::NoneGood | Combination::SeveralGood(_) => FrequencyBand::DEFAULT_ALPHA,
        }
    }
}
