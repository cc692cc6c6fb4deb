// BandPowerComputer - alpha RMS and guard-band quality factor per channel
//
// Each channel is centred, then band-passed three times: in the calibrated
// alpha band and in the two guard bands around it. Samples are scaled to
// micro-volts before squaring. Missing samples are skipped in the sums but
// still count in the divisor, so gaps lower the RMS instead of being
// ignored.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analysis::band::FrequencyBand;
use crate::analysis::conditioning::SignalConditioner;
use crate::analysis::DspToolkit;

/// Volts to micro-volts
const MICROVOLTS_PER_VOLT: f64 = 1.0e6;

/// Arithmetic of the guard-band quality factor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardQualityFormula {
    /// `2*sqrt(Pa) / (sqrt(Pl) + sqrt(Ph))`
    #[default]
    Balanced,
    /// `2*sqrt(Pa) / sqrt(Pl + sqrt(Ph))`
    Legacy,
}

impl GuardQualityFormula {
    /// Quality factor from mean powers of the alpha and guard bands
    pub fn quality(&self, alpha_power: f64, low_power: f64, high_power: f64) -> f64 {
        let numerator = 2.0 * alpha_power.sqrt();
        match self {
            GuardQualityFormula::Balanced => numerator / (low_power.sqrt() + high_power.sqrt()),
            GuardQualityFormula::Legacy => numerator / (low_power + high_power.sqrt()).sqrt(),
        }
    }
}

/// Alpha band power of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPowerEstimate {
    /// Alpha RMS in micro-volts; `+inf` when there was nothing to measure
    pub rms: f64,
    /// Alpha RMS relative to the guard bands; NaN when undefined
    pub quality: f64,
}

impl BandPowerEstimate {
    pub const NO_SIGNAL: BandPowerEstimate = BandPowerEstimate {
        rms: f64::INFINITY,
        quality: f64::NAN,
    };
}

pub struct BandPowerComputer {
    conditioner: Arc<dyn SignalConditioner>,
    sample_rate: f64,
    formula: GuardQualityFormula,
}

impl BandPowerComputer {
    pub fn new(sample_rate: f64, formula: GuardQualityFormula, toolkit: &DspToolkit) -> Self {
        Self {
            conditioner: Arc::clone(&toolkit.conditioner),
            sample_rate,
            formula,
        }
    }

    /// Band power of a single channel
    pub fn compute_channel(&self, signal: &[f64], alpha_band: FrequencyBand) -> BandPowerEstimate {
        if signal.is_empty() {
            return BandPowerEstimate::NO_SIGNAL;
        }
        let centred = self.conditioner.remove_dc(signal);
        let alpha = self
            .conditioner
            .band_pass(&centred, self.sample_rate, alpha_band);
        let guard_low = self
            .conditioner
            .band_pass(&centred, self.sample_rate, FrequencyBand::GUARD_LOW);
        let guard_high =
            self.conditioner
                .band_pass(&centred, self.sample_rate, FrequencyBand::GUARD_HIGH);

        let mut sums = [0.0_f64; 3];
        for i in 0..alpha.len() {
            if alpha[i].is_nan() {
                continue;
            }
            for (sum, value) in sums.iter_mut().zip([alpha[i], guard_low[i], guard_high[i]]) {
                let scaled = MICROVOLTS_PER_VOLT * value;
                *sum += scaled * scaled;
            }
        }
        let n = alpha.len() as f64;
        let [alpha_power, low_power, high_power] = sums.map(|s| s / n);

        BandPowerEstimate {
            rms: alpha_power.sqrt(),
            quality: self.formula.quality(alpha_power, low_power, high_power),
        }
    }

    /// Band power of every channel (rows) of a packet
    ///
    /// An empty packet yields the single `+inf` sentinel entry.
    pub fn compute(&self, packet: ArrayView2<f64>, alpha_band: FrequencyBand) -> Vec<BandPowerEstimate> {
        if packet.nrows() == 0 || packet.ncols() == 0 {
            return vec![BandPowerEstimate::NO_SIGNAL];
        }
        packet
            .rows()
            .into_iter()
            .map(|row| self.compute_channel(&row.to_vec(), alpha_band))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, amplitude: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / 250.0).sin())
            .collect()
    }

    fn computer() -> BandPowerComputer {
        BandPowerComputer::new(250.0, GuardQualityFormula::Balanced, &DspToolkit::default())
    }

    #[test]
    fn test_alpha_sine_has_high_rms_and_quality() {
        let signal = sine(10.0, 20.0e-6, 1000);
        let estimate = computer().compute_channel(&signal, FrequencyBand::new(8.0, 12.0));

        assert!(estimate.rms > 5.0, "Expected micro-volt RMS, got {}", estimate.rms);
        assert!(estimate.rms < 20.0);
        assert!(estimate.quality > 1.0, "Alpha should dominate guards: {}", estimate.quality);
    }

    #[test]
    fn test_guard_band_sine_has_low_quality() {
        let signal = sine(16.0, 20.0e-6, 1000);
        let estimate = computer().compute_channel(&signal, FrequencyBand::new(8.0, 12.0));
        assert!(estimate.quality < 1.0, "Guard energy should dominate: {}", estimate.quality);
    }

    #[test]
    fn test_nan_samples_lower_rms_with_full_divisor() {
        let full = sine(10.0, 20.0e-6, 1000);
        let mut gapped = full.clone();
        gapped[500..].iter_mut().for_each(|v| *v = f64::NAN);

        let band = FrequencyBand::new(8.0, 12.0);
        let rms_full = computer().compute_channel(&full, band).rms;
        let rms_gapped = computer().compute_channel(&gapped, band).rms;

        // Half the samples missing with the same divisor: power halves.
        let ratio = rms_gapped / rms_full;
        assert!(
            (ratio - 0.5_f64.sqrt()).abs() < 0.1,
            "Expected ~0.707 ratio, got {}",
            ratio
        );
    }

    #[test]
    fn test_all_nan_channel() {
        let estimate = computer().compute_channel(&[f64::NAN; 250], FrequencyBand::DEFAULT_ALPHA);
        assert_eq!(estimate.rms, 0.0);
        assert!(estimate.quality.is_nan());
    }

    #[test]
    fn test_empty_packet_sentinel() {
        let packet = Array2::<f64>::zeros((0, 0));
        let estimates = computer().compute(packet.view(), FrequencyBand::DEFAULT_ALPHA);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].rms, f64::INFINITY);
        assert!(estimates[0].quality.is_nan());
    }

    #[test]
    fn test_quality_formulas() {
        assert_eq!(GuardQualityFormula::Balanced.quality(4.0, 1.0, 1.0), 2.0);
        let legacy = GuardQualityFormula::Legacy.quality(4.0, 1.0, 1.0);
        assert!((legacy - 4.0 / 2.0_f64.sqrt()).abs() < 1e-12);
    }
}
