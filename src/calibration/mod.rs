// Calibration module - reference recording to session parameters
//
// This module provides three components:
// 1. validation: shape checks, quality folding, packet selection and gating
// 2. state: CalibrationParameters, the record every session is built from
// 3. procedure: CalibrationOrchestrator, which runs the whole calibration
//
// The calibration workflow:
// 1. Record a reference signal with per-packet quality labels
// 2. CalibrationOrchestrator::run on the recording and quality matrix
// 3. Hand the resulting CalibrationParameters to a SessionContext

pub mod procedure;
pub mod state;
pub mod validation;

pub use procedure::{AlphaBandEstimate, CalibrationOrchestrator};
pub use state::{CalibrationParameters, NormalizationBounds, CALIBRATION_OK};
pub use validation::{normalize_quality, InputValidator, QualityGate, QualitySummary};
