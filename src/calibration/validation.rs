// Input and quality validation for calibration
//
// This module checks the shape of a calibration recording against its
// quality matrix, folds raw quality labels into the reduced set used by the
// pipeline, selects usable packets and applies the quality gate.

use ndarray::ArrayView2;

use crate::config::{AcquisitionConfig, CalibrationConfig};
use crate::error::CalibrationError;

/// Fold a raw quality label into {0, 0.5, 1}
///
/// `0.25` counts as `0.5`, `-1` (unknown) and NaN count as `0`. Other values
/// pass through, so applying the fold twice changes nothing.
pub fn normalize_quality(quality: f64) -> f64 {
    if quality.is_nan() || quality == -1.0 {
        0.0
    } else if quality == 0.25 {
        0.5
    } else {
        quality
    }
}

/// Validator for calibration inputs
pub struct InputValidator;

impl InputValidator {
    /// Validate recording and quality matrix shapes
    ///
    /// # Returns
    /// * `Ok(())` - Shapes are consistent
    /// * `Err(CalibrationError::InvalidInput)` - With the first violated rule
    ///
    /// # Validation Rules
    /// * Both matrices non-empty
    /// * Same channel (row) count
    /// * Samples per channel = packets * packet_length
    /// * Positive sample rate and packet length
    pub fn validate(
        recording: ArrayView2<f64>,
        qualities: ArrayView2<f64>,
        acquisition: &AcquisitionConfig,
    ) -> Result<(), CalibrationError> {
        let invalid = |reason: String| Err(CalibrationError::InvalidInput { reason });

        if !(acquisition.sample_rate > 0.0) || acquisition.packet_length == 0 {
            return invalid(format!(
                "sample rate {} Hz / packet length {} must be positive",
                acquisition.sample_rate, acquisition.packet_length
            ));
        }
        if recording.is_empty() {
            return invalid("recording is empty".to_string());
        }
        if qualities.is_empty() {
            return invalid("quality matrix is empty".to_string());
        }
        if recording.nrows() != qualities.nrows() {
            return invalid(format!(
                "recording has {} channels, quality matrix has {}",
                recording.nrows(),
                qualities.nrows()
            ));
        }
        let expected = qualities.ncols() * acquisition.packet_length;
        if recording.ncols() != expected {
            return invalid(format!(
                "recording has {} samples per channel, expected {} ({} packets of {})",
                recording.ncols(),
                expected,
                qualities.ncols(),
                acquisition.packet_length
            ));
        }
        Ok(())
    }
}

/// Result of packet selection over a quality matrix
#[derive(Debug, Clone, PartialEq)]
pub struct QualitySummary {
    /// Indices of packets where at least one channel is usable
    pub kept_packets: Vec<usize>,
    /// Per-channel mean normalised quality over all packets
    pub mean_qualities: Vec<f64>,
}

/// Packet selection and calibration gating thresholds
#[derive(Debug, Clone)]
pub struct QualityGate {
    min_packet_quality: f64,
    general_threshold: f64,
    channel_threshold: f64,
}

impl QualityGate {
    pub fn new(min_packet_quality: f64, general_threshold: f64, channel_threshold: f64) -> Self {
        Self {
            min_packet_quality,
            general_threshold,
            channel_threshold,
        }
    }

    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self::new(
            config.min_packet_quality,
            config.general_quality_threshold,
            config.channel_quality_threshold,
        )
    }

    /// Select packets and compute per-channel mean quality
    ///
    /// The mean divides by the total packet count, not the kept count.
    pub fn summarize(&self, qualities: ArrayView2<f64>) -> QualitySummary {
        let packets = qualities.ncols();
        let kept_packets = (0..packets)
            .filter(|&p| {
                qualities
                    .column(p)
                    .iter()
                    .any(|&q| normalize_quality(q) >= self.min_packet_quality)
            })
            .collect();
        let mean_qualities = qualities
            .rows()
            .into_iter()
            .map(|row| {
                if packets == 0 {
                    0.0
                } else {
                    row.iter().map(|&q| normalize_quality(q)).sum::<f64>() / packets as f64
                }
            })
            .collect();

        QualitySummary {
            kept_packets,
            mean_qualities,
        }
    }

    /// One channel above the channel threshold, or every channel above the general one
    pub fn passes(&self, mean_qualities: &[f64]) -> bool {
        if mean_qualities.iter().any(|&q| q >= self.channel_threshold) {
            return true;
        }
        !mean_qualities.is_empty() && mean_qualities.iter().all(|&q| q >= self.general_threshold)
    }
}
