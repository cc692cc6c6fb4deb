// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibration error code constants
///
/// The negative values are part of the external contract: clients map
/// `-1` to "bad input" and `-2` to "signal quality too bad".
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Recording or quality matrix malformed
    pub const INVALID_INPUT: i32 = -1;

    /// Quality gate rejected the recording
    pub const INSUFFICIENT_QUALITY: i32 = -2;
}

/// Log a calibration error with structured context
///
/// Emits the numeric code, the originating component and the message so the
/// line can be filtered without parsing the free-text part.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationOrchestrator, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalibrationError {
    /// Empty or inconsistent recording / quality matrices
    InvalidInput { reason: String },

    /// Per-channel mean quality too low to trust the recording
    InsufficientQuality { mean_qualities: Vec<f64> },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InvalidInput { .. } => CalibrationErrorCodes::INVALID_INPUT,
            CalibrationError::InsufficientQuality { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_QUALITY
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InvalidInput { reason } => {
                format!("Invalid calibration input: {}", reason)
            }
            CalibrationError::InsufficientQuality { mean_qualities } => {
                let formatted: Vec<String> =
                    mean_qualities.iter().map(|q| format!("{:.3}", q)).collect();
                format!(
                    "Signal quality too low for calibration (mean qualities: [{}])",
                    formatted.join(", ")
                )
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
