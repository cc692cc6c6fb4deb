//! Configuration management for the neurofeedback pipeline
//!
//! This module provides runtime configuration loading from JSON files so the
//! acquisition layout, calibration thresholds and spectral parameters can be
//! tuned without recompiling. Every section falls back to defaults field by
//! field, so a partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::band::FrequencyBand;
use crate::analysis::band_power::GuardQualityFormula;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NeurofeedbackConfig {
    pub acquisition: AcquisitionConfig,
    pub calibration: CalibrationConfig,
    pub spectral: SpectralConfig,
    pub session: SessionConfig,
}

/// Device sampling layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Sampling rate in Hz
    pub sample_rate: f64,
    /// Samples per channel in one packet
    pub packet_length: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 250.0,
            packet_length: 250,
        }
    }
}

/// Calibration gating and windowing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// A packet is kept when at least one channel reaches this quality
    pub min_packet_quality: f64,
    /// Every channel must reach this mean quality (unless one passes the channel threshold)
    pub general_quality_threshold: f64,
    /// A single channel above this mean quality is enough to pass the gate
    pub channel_quality_threshold: f64,
    /// IAF window length, in packets
    pub iaf_window_packets: usize,
    /// Band searched for the alpha peak
    pub search_band: FrequencyBand,
    /// Lower normalisation bound = min(smoothed RMS) * min_factor
    pub min_factor: f64,
    /// Upper normalisation bound = mean(smoothed RMS) * max_factor
    pub max_factor: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_packet_quality: 0.5,
            general_quality_threshold: 0.5,
            channel_quality_threshold: 0.75,
            iaf_window_packets: 8,
            search_band: FrequencyBand::SEARCH,
            min_factor: 0.9,
            max_factor: 1.5,
        }
    }
}

/// Spectral estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectralConfig {
    /// Band kept for background noise fitting and peak search
    pub analysis_band: FrequencyBand,
    /// Welch segment length in samples
    pub segment_length: usize,
    /// Overlap between consecutive Welch segments
    pub overlap: usize,
    /// Zero-padded FFT length
    pub fft_length: usize,
    /// Quality factor arithmetic for the band power computer
    pub guard_quality_formula: GuardQualityFormula,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            analysis_band: FrequencyBand::ANALYSIS,
            segment_length: 128,
            overlap: 64,
            fft_length: 512,
            guard_quality_formula: GuardQualityFormula::default(),
        }
    }
}

/// Live session parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Smoothing window, in packets
    pub smoothing_duration: usize,
    /// Consecutive all-zero-quality packets before the output goes indeterminate
    pub max_bad_packet_streak: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            smoothing_duration: 2,
            max_bad_packet_streak: 4,
        }
    }
}

impl NeurofeedbackConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// Loaded configuration, or the defaults if the file is missing or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_file(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!("[Config] {:#}. Using defaults.", err);
                Self::default()
            }
        }
    }

    /// Load configuration from JSON file, reporting failures
    pub fn try_load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))
    }

    /// Smoothing window in packets, never zero
    pub fn smoothing_window(&self) -> usize {
        self.session.smoothing_duration.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NeurofeedbackConfig::default();
        assert_eq!(config.acquisition.sample_rate, 250.0);
        assert_eq!(config.acquisition.packet_length, 250);
        assert_eq!(config.calibration.iaf_window_packets, 8);
        assert_eq!(config.calibration.search_band, FrequencyBand::new(6.0, 13.0));
        assert_eq!(config.spectral.fft_length, 512);
        assert_eq!(config.session.smoothing_duration, 2);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = NeurofeedbackConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: NeurofeedbackConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "session": { "smoothing_duration": 5 } }"#;
        let parsed: NeurofeedbackConfig = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.session.smoothing_duration, 5);
        assert_eq!(parsed.session.max_bad_packet_streak, 4);
        assert_eq!(parsed.acquisition, AcquisitionConfig::default());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = NeurofeedbackConfig::load_from_file("does/not/exist.json");
        assert_eq!(config, NeurofeedbackConfig::default());

        let err = NeurofeedbackConfig::try_load_from_file("does/not/exist.json").unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_smoothing_window_never_zero() {
        let mut config = NeurofeedbackConfig::default();
        config.session.smoothing_duration = 0;
        assert_eq!(config.smoothing_window(), 1);
    }
}
