// Error types for the neurofeedback core
//
// This module defines the error types reported by calibration and session
// processing, with numeric codes that downstream clients already understand.
// Indeterminate measurements are not errors: they travel as NaN / +inf values
// and status enums inside the pipeline.

mod calibration;
mod session;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so callers can forward a stable integer code
/// across process or language boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
