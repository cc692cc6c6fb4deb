// Session error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// Error code range: 3001-3002
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Session was started from failed calibration parameters
    pub const CALIBRATION_UNAVAILABLE: i32 = 3001;

    /// Packet shape does not match the session layout
    pub const INVALID_PACKET: i32 = 3002;
}

/// Log a session error with structured context
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionContext, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors reported alongside the `+inf` relaxation sentinel
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Calibration failed with the given calibration error code
    CalibrationUnavailable { code: i32 },

    /// Packet is empty or has the wrong channel count
    InvalidPacket { reason: String },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::CalibrationUnavailable { .. } => {
                SessionErrorCodes::CALIBRATION_UNAVAILABLE
            }
            SessionError::InvalidPacket { .. } => SessionErrorCodes::INVALID_PACKET,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::CalibrationUnavailable { code } => {
                format!("Calibration unavailable (calibration code {})", code)
            }
            SessionError::InvalidPacket { reason } => format!("Invalid packet: {}", reason),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(
            SessionError::CalibrationUnavailable { code: -2 }.code(),
            SessionErrorCodes::CALIBRATION_UNAVAILABLE
        );
        assert_eq!(
            SessionError::InvalidPacket {
                reason: "x".to_string()
            }
            .code(),
            SessionErrorCodes::INVALID_PACKET
        );
    }

    #[test]
    fn test_session_error_messages() {
        let err = SessionError::CalibrationUnavailable { code: -2 };
        assert!(err.message().contains("-2"));

        let err = SessionError::InvalidPacket {
            reason: "expected 2 channels, got 3".to_string(),
        };
        assert_eq!(err.message(), "Invalid packet: expected 2 channels, got 3");
    }
}
