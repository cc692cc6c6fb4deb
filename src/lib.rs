// Neurofeedback Core - alpha-band relaxation feedback engine
// Calibration from a reference recording, then per-packet volume control

// Module declarations
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod session;

#[cfg(any(test, feature = "synthetic_fixtures"))]
pub mod testing;

// Re-exports for convenience
pub use analysis::{
    AlphaPeakDetector, BandPowerComputer, BandPowerEstimate, ChannelCombiner, DspToolkit,
    FrequencyBand, FrequencyHistory, GuardQualityFormula, PeakEstimate,
};
pub use calibration::{CalibrationOrchestrator, CalibrationParameters, NormalizationBounds};
pub use config::NeurofeedbackConfig;
pub use error::{CalibrationError, ErrorCode, SessionError};
pub use session::{FrameStatus, SessionContext, SessionFrame, VolumeStatus};

/// Install a `tracing` fmt subscriber for the process
///
/// Safe to call more than once; only the first call installs the subscriber.
/// `log` records are forwarded through the same output, written to stderr.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }

    #[test]
    fn test_calibrate_then_run_session() {
        use crate::testing::fixtures::{constant_quality, EegFixture};

        let config = NeurofeedbackConfig::default();
        let recording = EegFixture::new(21).recording(2, 12, 250);
        let qualities = constant_quality(2, 12, 1.0);
        let params = CalibrationOrchestrator::new(config.clone()).run(recording.view(), qualities.view());
        assert!(params.is_valid());

        let mut session = SessionContext::new(params, config);
        let packet = EegFixture::new(22).recording(2, 1, 250);
        let frame = session.process_packet(packet.view(), None);
        assert!((0.0..=1.0).contains(&frame.volume));
    }
}
