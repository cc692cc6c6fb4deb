// Session module - live packet processing against a calibration
//
// SessionContext owns everything one neurofeedback session needs:
// - the calibration parameters it was created from
// - band power, peak detection and channel combination collaborators
// - the relaxation-index history and its smoothed counterpart
// - the bad-quality streak counter and per-session alpha statistics
//
// Per packet:
// 1. Reject (+inf) when calibration failed or the packet shape is wrong
// 2. NaN when quality has been zero on every channel for too long, or when
//    every sample is missing
// 3. Otherwise alpha RMS per channel in the calibrated band, combined
// 4. Append, smooth, normalise, map to a volume
//
// Sessions share no state; several may run on different threads.

pub mod normalize;
pub mod smoothing;
pub mod stats;
pub mod volume;

pub use normalize::Normalizer;
pub use smoothing::Smoother;
pub use stats::SessionAlphaStats;
pub use volume::{VolumeMapper, VolumeReading, VolumeStatus, FALLBACK_VOLUME};

use ndarray::ArrayView2;

use crate::analysis::band::FrequencyBand;
use crate::analysis::band_power::BandPowerComputer;
use crate::analysis::combiner::ChannelCombiner;
use crate::analysis::peak::{AlphaPeakDetector, FrequencyHistory, PeakEstimate};
use crate::analysis::DspToolkit;
use crate::calibration::state::CalibrationParameters;
use crate::calibration::validation::normalize_quality;
use crate::config::NeurofeedbackConfig;
use crate::error::{log_session_error, SessionError};

/// Outcome class of one processed packet
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus {
    /// Relax index computed from the packet
    Valid,
    /// Packet could not be measured (bad quality streak, missing samples)
    Indeterminate,
    /// Session cannot measure at all for this packet
    Failed(SessionError),
}

/// Everything computed for one packet
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFrame {
    /// Combined alpha RMS; NaN when indeterminate, `+inf` on failure
    pub relax_index: f64,
    /// Trailing mean of the relax history
    pub smoothed: f64,
    /// z-score of `smoothed` against the calibration history
    pub normalized: f64,
    /// Actuator volume in [0, 1]
    pub volume: f64,
    pub volume_status: VolumeStatus,
    pub status: FrameStatus,
}

pub struct SessionContext {
    config: NeurofeedbackConfig,
    calibration: CalibrationParameters,
    alpha_band: FrequencyBand,
    band_power: BandPowerComputer,
    peak_detector: AlphaPeakDetector,
    combiner: ChannelCombiner,
    smoother: Smoother,
    normalizer: Normalizer,
    volume: VolumeMapper,
    frequency_history: FrequencyHistory,
    relax_history: Vec<f64>,
    smoothed_history: Vec<f64>,
    bad_streak: usize,
    alpha_stats: SessionAlphaStats,
}

impl SessionContext {
    /// Create a session with the standard DSP collaborators
    pub fn new(calibration: CalibrationParameters, config: NeurofeedbackConfig) -> Self {
        let toolkit = DspToolkit::from_config(&config.spectral);
        Self::with_toolkit(calibration, config, &toolkit)
    }

    /// Create a session with caller-supplied DSP collaborators
    ///
    /// # Arguments
    /// * `calibration` - Parameters of a previous calibration, possibly failed
    /// * `config` - Session configuration; acquisition settings should match
    ///   the ones used for calibration
    /// * `toolkit` - Conditioning and spectral collaborators
    pub fn with_toolkit(
        calibration: CalibrationParameters,
        config: NeurofeedbackConfig,
        toolkit: &DspToolkit,
    ) -> Self {
        let sample_rate = config.acquisition.sample_rate;
        if let Some(err) = Self::calibration_error(&calibration) {
            log_session_error(&err, "SessionContext::new");
        }

        Self {
            alpha_band: calibration.alpha_band.unwrap_or(FrequencyBand::DEFAULT_ALPHA),
            band_power: BandPowerComputer::new(
                sample_rate,
                config.spectral.guard_quality_formula,
                toolkit,
            ),
            peak_detector: AlphaPeakDetector::new(sample_rate, config.spectral.analysis_band, toolkit),
            combiner: ChannelCombiner::new(),
            smoother: Smoother::new(config.smoothing_window()),
            normalizer: Normalizer::new(),
            volume: VolumeMapper::new(calibration.bounds),
            frequency_history: FrequencyHistory::from_values(calibration.frequency_history.clone()),
            relax_history: Vec::new(),
            smoothed_history: Vec::new(),
            bad_streak: 0,
            alpha_stats: SessionAlphaStats::new(),
            calibration,
            config,
        }
    }

    fn calibration_error(calibration: &CalibrationParameters) -> Option<SessionError> {
        if calibration.is_valid() {
            None
        } else {
            Some(SessionError::CalibrationUnavailable {
                code: calibration.status_code(),
            })
        }
    }

    /// Process one packet
    ///
    /// # Arguments
    /// * `packet` - Channels x samples, volts, NaN for missing samples
    /// * `qualities` - Optional quality label per channel for this packet
    ///
    /// # Returns
    /// The frame for this packet; its volume is always in [0, 1]
    pub fn process_packet(&mut self, packet: ArrayView2<f64>, qualities: Option<&[f64]>) -> SessionFrame {
        if let Some(err) = Self::calibration_error(&self.calibration) {
            tracing::debug!("[Session] Packet skipped, calibration unavailable");
            return self.failed_frame(err);
        }
        if let Err(err) = self.check_packet(packet, qualities) {
            log_session_error(&err, "process_packet");
            return self.failed_frame(err);
        }

        let normalized_qualities: Option<Vec<f64>> =
            qualities.map(|q| q.iter().map(|&v| normalize_quality(v)).collect());
        let relax_index = self.measure(packet, normalized_qualities.as_deref());
        if let Some(q) = &normalized_qualities {
            self.alpha_stats.record(relax_index, q);
        }

        self.relax_history.push(relax_index);
        let smoothed = self.smoother.smooth(&self.relax_history);
        self.smoothed_history.push(smoothed);
        let normalized = self
            .normalizer
            .normalize(smoothed, &self.calibration.smoothed_rms_history);
        let reading = self.volume.map(smoothed);

        let status = if relax_index.is_nan() {
            FrameStatus::Indeterminate
        } else {
            FrameStatus::Valid
        };
        tracing::debug!(
            "[Session] Packet {}: relax {:.3}, smoothed {:.3}, z {:.3}, volume {:.3} ({:?})",
            self.relax_history.len(),
            relax_index,
            smoothed,
            normalized,
            reading.volume,
            reading.status
        );

        SessionFrame {
            relax_index,
            smoothed,
            normalized,
            volume: reading.volume,
            volume_status: reading.status,
            status,
        }
    }

    fn check_packet(&self, packet: ArrayView2<f64>, qualities: Option<&[f64]>) -> Result<(), SessionError> {
        let invalid = |reason: String| Err(SessionError::InvalidPacket { reason });
        if packet.is_empty() {
            return invalid("packet is empty".to_string());
        }
        if packet.nrows() != self.calibration.channel_count {
            return invalid(format!(
                "packet has {} channels, calibration has {}",
                packet.nrows(),
                self.calibration.channel_count
            ));
        }
        if let Some(q) = qualities {
            if q.len() != packet.nrows() {
                return invalid(format!(
                    "{} quality labels for {} channels",
                    q.len(),
                    packet.nrows()
                ));
            }
        }
        Ok(())
    }

    /// Relax index of a well-formed packet, NaN when it cannot be measured
    fn measure(&mut self, packet: ArrayView2<f64>, qualities: Option<&[f64]>) -> f64 {
        if let Some(q) = qualities {
            if q.iter().all(|&v| v == 0.0) {
                self.bad_streak += 1;
            } else {
                self.bad_streak = 0;
            }
        }
        let limit = self.config.session.max_bad_packet_streak;
        if limit > 0 && self.bad_streak >= limit {
            tracing::warn!(
                "[Session] {} consecutive packets without signal quality",
                self.bad_streak
            );
            return f64::NAN;
        }

        if packet.iter().all(|v| v.is_nan()) {
            tracing::warn!("[Session] Every sample of the packet is missing");
            return f64::NAN;
        }

        let estimates = self.band_power.compute(packet, self.alpha_band);
        let values: Vec<f64> = estimates.iter().map(|e| e.rms).collect();
        let factors: Vec<f64> = estimates.iter().map(|e| e.quality).collect();
        self.combiner.combine_band_power(&values, &factors)
    }

    fn failed_frame(&self, err: SessionError) -> SessionFrame {
        let reading = self.volume.map(f64::INFINITY);
        SessionFrame {
            relax_index: f64::INFINITY,
            smoothed: f64::INFINITY,
            normalized: f64::INFINITY,
            volume: reading.volume,
            volume_status: reading.status,
            status: FrameStatus::Failed(err),
        }
    }

    /// Peak frequency per channel over a window of recent samples
    ///
    /// Uses the session frequency history, seeded from calibration, and the
    /// calibration search band.
    pub fn track_peak_frequency(&mut self, window: ArrayView2<f64>) -> Vec<PeakEstimate> {
        let search_band = self.config.calibration.search_band;
        let peaks = self
            .peak_detector
            .detect_channels(window, search_band, &mut self.frequency_history);
        tracing::debug!(
            "[Session] Peak frequencies {:?}, history {} entries",
            peaks.iter().map(|p| p.frequency).collect::<Vec<_>>(),
            self.frequency_history.len()
        );
        peaks
    }

    /// Clear session state; calibration and seeded frequency history are kept
    pub fn reset(&mut self) {
        self.relax_history.clear();
        self.smoothed_history.clear();
        self.bad_streak = 0;
        self.alpha_stats.reset();
        self.frequency_history = FrequencyHistory::from_values(self.calibration.frequency_history.clone());
        tracing::info!("[Session] Reset");
    }

    pub fn calibration(&self) -> &CalibrationParameters {
        &self.calibration
    }

    pub fn alpha_band(&self) -> FrequencyBand {
        self.alpha_band
    }

    pub fn relax_history(&self) -> &[f64] {
        &self.relax_history
    }

    pub fn smoothed_history(&self) -> &[f64] {
        &self.smoothed_history
    }

    pub fn frequency_history(&self) -> &FrequencyHistory {
        &self.frequency_history
    }

    pub fn alpha_stats(&self) -> &SessionAlphaStats {
        &self.alpha_stats
    }
}
