// CalibrationOrchestrator - reference recording to calibration parameters
//
// This module turns a reference recording and its per-packet quality labels
// into the parameters every session depends on:
// 1. Validate shapes, fold quality labels, select usable packets
// 2. Gate on per-channel mean quality
// 3. Alpha band: peak detection over 8-packet windows (1-packet step) of the
//    kept packets, combined per window, averaged across windows
// 4. RMS history: band power per kept packet inside that band, combined per
//    packet, smoothed incrementally
// 5. Normalisation bounds from the smoothed history
//
// Failures never panic or return early without parameters: the caller always
// gets a `CalibrationParameters`, possibly the failure sentinel.

use ndarray::{s, Array2, ArrayView2, Axis};

use crate::analysis::band::FrequencyBand;
use crate::analysis::band_power::BandPowerComputer;
use crate::analysis::combiner::ChannelCombiner;
use crate::analysis::peak::{AlphaPeakDetector, FrequencyHistory};
use crate::analysis::stats::finite_mean;
use crate::analysis::DspToolkit;
use crate::calibration::state::{CalibrationParameters, NormalizationBounds};
use crate::calibration::validation::{InputValidator, QualityGate};
use crate::config::NeurofeedbackConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::session::smoothing::Smoother;

/// Alpha band estimate over the sliding windows
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaBandEstimate {
    /// Averaged band, or the default band when no window produced bounds
    pub band: FrequencyBand,
    /// Combined band of every window, in order
    pub window_bands: Vec<FrequencyBand>,
}

/// Drives peak detection and band power over a reference recording
pub struct CalibrationOrchestrator {
    config: NeurofeedbackConfig,
    peak_detector: AlphaPeakDetector,
    band_power: BandPowerComputer,
    combiner: ChannelCombiner,
    gate: QualityGate,
    smoother: Smoother,
}

impl CalibrationOrchestrator {
    /// Create an orchestrator with the standard DSP collaborators
    pub fn new(config: NeurofeedbackConfig) -> Self {
        let toolkit = DspToolkit::from_config(&config.spectral);
        Self::with_toolkit(config, &toolkit)
    }

    /// Create an orchestrator with caller-supplied DSP collaborators
    pub fn with_toolkit(config: NeurofeedbackConfig, toolkit: &DspToolkit) -> Self {
        let sample_rate = config.acquisition.sample_rate;
        Self {
            peak_detector: AlphaPeakDetector::new(
                sample_rate,
                config.spectral.analysis_band,
                toolkit,
            ),
            band_power: BandPowerComputer::new(
                sample_rate,
                config.spectral.guard_quality_formula,
                toolkit,
            ),
            combiner: ChannelCombiner::new(),
            gate: QualityGate::from_config(&config.calibration),
            smoother: Smoother::new(config.smoothing_window()),
            config,
        }
    }

    pub fn config(&self) -> &NeurofeedbackConfig {
        &self.config
    }

    /// Run a calibration
    ///
    /// # Arguments
    /// * `recording` - Channels x samples, volts, NaN for missing samples
    /// * `qualities` - Channels x packets quality labels
    ///
    /// # Returns
    /// Calibration parameters; on failure the sentinel parameters carrying
    /// the error (see `CalibrationParameters::failed`)
    pub fn run(&self, recording: ArrayView2<f64>, qualities: ArrayView2<f64>) -> CalibrationParameters {
        match self.try_run(recording, qualities) {
            Ok(parameters) => parameters,
            Err(err) => {
                log_calibration_error(&err, "run");
                CalibrationParameters::failed(err, recording.nrows())
            }
        }
    }

    /// Run a calibration, returning the failure as an error
    pub fn try_run(
        &self,
        recording: ArrayView2<f64>,
        qualities: ArrayView2<f64>,
    ) -> Result<CalibrationParameters, CalibrationError> {
        InputValidator::validate(recording, qualities, &self.config.acquisition)?;

        let summary = self.gate.summarize(qualities);
        if !self.gate.passes(&summary.mean_qualities) {
            return Err(CalibrationError::InsufficientQuality {
                mean_qualities: summary.mean_qualities,
            });
        }
        tracing::info!(
            "[Calibration] Kept {}/{} packets, mean qualities {:?}",
            summary.kept_packets.len(),
            qualities.ncols(),
            summary.mean_qualities
        );

        let kept = self.concatenate_packets(recording, &summary.kept_packets);
        let mut history = FrequencyHistory::new();
        let alpha = self.estimate_alpha_band(kept.view(), &mut history);
        let (raw_rms_history, smoothed_rms_history) = self.rms_history(kept.view(), alpha.band);

        let bounds = NormalizationBounds::from_history(
            &smoothed_rms_history,
            self.config.calibration.min_factor,
            self.config.calibration.max_factor,
        );
        if bounds.is_none() {
            tracing::warn!("[Calibration] No finite smoothed RMS, normalisation bounds unavailable");
        }

        tracing::info!(
            "[Calibration] Alpha band [{:.2}, {:.2}] Hz from {} windows, {} RMS values, bounds {:?}",
            alpha.band.low_hz,
            alpha.band.high_hz,
            alpha.window_bands.len(),
            raw_rms_history.len(),
            bounds
        );

        Ok(CalibrationParameters {
            alpha_band: Some(alpha.band),
            raw_rms_history,
            smoothed_rms_history,
            frequency_history: history.values().to_vec(),
            bounds,
            mean_qualities: summary.mean_qualities,
            kept_packets: summary.kept_packets,
            channel_count: recording.nrows(),
            error: None,
        })
    }

    /// Kept packets laid end to end
    fn concatenate_packets(&self, recording: ArrayView2<f64>, kept: &[usize]) -> Array2<f64> {
        let packet_length = self.config.acquisition.packet_length;
        let mut output = Array2::<f64>::zeros((recording.nrows(), kept.len() * packet_length));
        for (slot, &packet) in kept.iter().enumerate() {
            let source = recording.slice(s![.., packet * packet_length..(packet + 1) * packet_length]);
            output
                .slice_mut(s![.., slot * packet_length..(slot + 1) * packet_length])
                .assign(&source);
        }
        output
    }

    /// Personalised alpha band from sliding-window peak detection
    ///
    /// Falls back to the default band when the kept data is shorter than one
    /// window or no window yields finite bounds.
    pub fn estimate_alpha_band(
        &self,
        kept: ArrayView2<f64>,
        history: &mut FrequencyHistory,
    ) -> AlphaBandEstimate {
        let packet_length = self.config.acquisition.packet_length;
        let window = self.config.calibration.iaf_window_packets.max(1) * packet_length;
        let step = packet_length;
        let search_band = self.config.calibration.search_band;

        let mut window_bands = Vec::new();
        if kept.ncols() >= window {
            for start in (0..=kept.ncols() - window).step_by(step) {
                let segment = kept.slice(s![.., start..start + window]);
                let peaks = self.peak_detector.detect_channels(segment, search_band, history);
                let frequencies: Vec<f64> = peaks.iter().map(|p| p.frequency).collect();
                let qualities: Vec<f64> = peaks.iter().map(|p| p.quality).collect();
                let band = self.combiner.combine_peak_frequency(&frequencies, &qualities);
                tracing::debug!(
                    "[Calibration] IAF window @{}: peaks {:?} -> [{:.2}, {:.2}]",
                    start / step,
                    frequencies,
                    band.low_hz,
                    band.high_hz
                );
                window_bands.push(band);
            }
        }

        let band = FrequencyBand::new(
            finite_mean(window_bands.iter().map(|b| b.low_hz)),
            finite_mean(window_bands.iter().map(|b| b.high_hz)),
        );
        let band = if band.is_valid() {
            band
        } else {
            tracing::warn!(
                "[Calibration] No IAF window available ({} samples kept, {} needed), using default alpha band",
                kept.ncols(),
                window
            );
            FrequencyBand::DEFAULT_ALPHA
        };

        AlphaBandEstimate { band, window_bands }
    }

    /// Raw and smoothed combined RMS, one value per kept packet
    pub fn rms_history(&self, kept: ArrayView2<f64>, alpha_band: FrequencyBand) -> (Vec<f64>, Vec<f64>) {
        let packet_length = self.config.acquisition.packet_length;
        let mut raw = Vec::new();
        let mut smoothed = Vec::new();

        for packet in kept.axis_chunks_iter(Axis(1), packet_length) {
            let estimates = self.band_power.compute(packet, alpha_band);
            let values: Vec<f64> = estimates.iter().map(|e| e.rms).collect();
            let qualities: Vec<f64> = estimates.iter().map(|e| e.quality).collect();
            raw.push(self.combiner.combine_band_power(&values, &qualities));
            smoothed.push(self.smoother.smooth(&raw));
        }

        (raw, smoothed)
    }
}

#[cfg(test)]
#[path = "procedure_tests.rs"]
mod tests;
