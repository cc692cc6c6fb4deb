// Analysis module - spectral DSP for alpha neurofeedback
//
// This module holds the signal-level building blocks shared by calibration
// and live sessions. Nothing in here keeps state between calls except the
// frequency history the caller passes to the peak detector.
//
// Module organization:
// - band: FrequencyBand and the standard EEG bands
// - conditioning: SignalConditioner trait + default NaN-aware implementation
// - spectrum: SpectralEstimator trait + Welch implementation
// - noise: background noise floor regression
// - peak: individual alpha frequency detection
// - band_power: alpha RMS and guard-band quality factor
// - combiner: quality-weighted two-channel combination
// - stats: small numeric helpers

pub mod band;
pub mod band_power;
pub mod combiner;
pub mod conditioning;
pub mod noise;
pub mod peak;
pub mod spectrum;
pub mod stats;

use std::sync::Arc;

use crate::config::SpectralConfig;
use conditioning::{SignalConditioner, StandardConditioner};
use spectrum::{SpectralEstimator, WelchEstimator};

pub use band::FrequencyBand;
pub use band_power::{BandPowerComputer, BandPowerEstimate, GuardQualityFormula};
pub use combiner::ChannelCombiner;
pub use peak::{AlphaPeakDetector, FrequencyHistory, PeakEstimate};

/// Conditioning and spectral collaborators shared by the analysis stages
///
/// Both halves are trait objects so callers can substitute their own
/// preprocessing or PSD estimator; clones share the same instances.
#[derive(Clone)]
pub struct DspToolkit {
    pub conditioner: Arc<dyn SignalConditioner>,
    pub estimator: Arc<dyn SpectralEstimator>,
}

impl DspToolkit {
    pub fn new(
        conditioner: Arc<dyn SignalConditioner>,
        estimator: Arc<dyn SpectralEstimator>,
    ) -> Self {
        Self {
            conditioner,
            estimator,
        }
    }

    /// Standard conditioner + Welch estimator configured from `config`
    pub fn from_config(config: &SpectralConfig) -> Self {
        Self::new(
            Arc::new(StandardConditioner::new()),
            Arc::new(WelchEstimator::from_config(config)),
        )
    }
}

impl Default for DspToolkit {
    fn default() -> Self {
        Self::from_config(&SpectralConfig::default())
    }
}
