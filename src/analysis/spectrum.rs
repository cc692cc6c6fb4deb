// Spectrum module - Welch power spectral density
//
// This module averages windowed, zero-padded periodograms of overlapping
// segments. Output is a one-sided density in unit²/Hz, so the area under the
// spectrum equals the signal power.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::config::SpectralConfig;

/// One-sided power spectrum with its frequency axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralEstimate {
    /// Bin frequencies in Hz, ascending
    pub frequencies: Vec<f64>,
    /// Power density per bin
    pub powers: Vec<f64>,
}

impl SpectralEstimate {
    /// True when no bin carries a number
    pub fn is_undefined(&self) -> bool {
        self.powers.iter().all(|p| p.is_nan())
    }

    /// Copy of the bins `first..=last`
    pub fn slice(&self, first: usize, last: usize) -> SpectralEstimate {
        SpectralEstimate {
            frequencies: self.frequencies[first..=last].to_vec(),
            powers: self.powers[first..=last].to_vec(),
        }
    }
}

/// Power spectral density estimator
pub trait SpectralEstimator: Send + Sync {
    fn power_spectral_density(&self, signal: &[f64], sample_rate: f64) -> SpectralEstimate;
}

/// Welch estimator with a Hamming window
pub struct WelchEstimator {
    segment_length: usize,
    overlap: usize,
    fft_length: usize,
    fft: Arc<dyn Fft<f64>>,
    /// Hamming window for full-length segments (pre-computed)
    window: Vec<f64>,
}

impl WelchEstimator {
    /// Create a new estimator
    ///
    /// # Arguments
    /// * `segment_length` - Samples per segment (typically 128)
    /// * `overlap` - Samples shared by consecutive segments (typically 64)
    /// * `fft_length` - Zero-padded FFT size (typically 512)
    pub fn new(segment_length: usize, overlap: usize, fft_length: usize) -> Self {
        let segment_length = segment_length.max(1);
        let fft_length = fft_length.max(segment_length);
        let fft = FftPlanner::new().plan_fft_forward(fft_length);

        Self {
            segment_length,
            overlap: overlap.min(segment_length - 1),
            fft_length,
            fft,
            window: hamming(segment_length),
        }
    }

    pub fn from_config(config: &SpectralConfig) -> Self {
        Self::new(config.segment_length, config.overlap, config.fft_length)
    }

    fn frequencies(&self, sample_rate: f64) -> Vec<f64> {
        let resolution = sample_rate / self.fft_length as f64;
        (0..=self.fft_length / 2)
            .map(|k| k as f64 * resolution)
            .collect()
    }
}

impl Default for WelchEstimator {
    fn default() -> Self {
        Self::from_config(&SpectralConfig::default())
    }
}

impl SpectralEstimator for WelchEstimator {
    fn power_spectral_density(&self, signal: &[f64], sample_rate: f64) -> SpectralEstimate {
        let frequencies = self.frequencies(sample_rate);
        let bins = frequencies.len();

        if signal.is_empty() || signal.iter().any(|v| v.is_nan()) {
            return SpectralEstimate {
                frequencies,
                powers: vec![f64::NAN; bins],
            };
        }

        // Short inputs collapse to a single segment of their own length.
        let short_window;
        let (segment, overlap, window): (usize, usize, &[f64]) =
            if signal.len() < self.segment_length {
                short_window = hamming(signal.len());
                (signal.len(), 0, &short_window)
            } else {
                (self.segment_length, self.overlap, &self.window)
            };
        let step = segment - overlap;
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (sample_rate * window_power);

        let mut accumulated = vec![0.0; bins];
        let mut segments = 0usize;
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); self.fft_length];

        for start in (0..=signal.len() - segment).step_by(step) {
            for (slot, (sample, w)) in buffer
                .iter_mut()
                .zip(signal[start..start + segment].iter().zip(window))
            {
                *slot = Complex::new(sample * w, 0.0);
            }
            buffer[segment..]
                .iter_mut()
                .for_each(|slot| *slot = Complex::new(0.0, 0.0));

            self.fft.process(&mut buffer);

            for (acc, value) in accumulated.iter_mut().zip(&buffer[..bins]) {
                *acc += value.norm_sqr();
            }
            segments += 1;
        }

        let nyquist_bin = if self.fft_length % 2 == 0 {
            Some(bins - 1)
        } else {
            None
        };
        let powers = accumulated
            .iter()
            .enumerate()
            .map(|(k, acc)| {
                let density = acc * scale / segments as f64;
                if k == 0 || Some(k) == nyquist_bin {
                    density
                } else {
                    2.0 * density
                }
            })
            .collect();

        SpectralEstimate {
            frequencies,
            powers,
        }
    }
}

/// Symmetric Hamming window
fn hamming(length: usize) -> Vec<f64> {
    if length == 1 {
        return vec![1.0];
    }
    (0..length)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (length - 1) as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, amplitude: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_frequency_axis() {
        let estimator = WelchEstimator::default();
        let estimate = estimator.power_spectral_density(&sine(10.0, 1.0, 250.0, 1000), 250.0);
        assert_eq!(estimate.frequencies.len(), 257);
        assert_eq!(estimate.frequencies[0], 0.0);
        assert!((estimate.frequencies[256] - 125.0).abs() < 1e-12);
    }

    #[test]
    fn test_sine_peak_location() {
        let estimator = WelchEstimator::default();
        let estimate = estimator.power_spectral_density(&sine(20.0, 1.0, 250.0, 2000), 250.0);
        let (peak_bin, _) = estimate
            .powers
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        assert!(
            (estimate.frequencies[peak_bin] - 20.0).abs() < 0.5,
            "Peak at {} Hz",
            estimate.frequencies[peak_bin]
        );
    }

    #[test]
    fn test_density_integrates_to_power() {
        let estimator = WelchEstimator::default();
        let estimate = estimator.power_spectral_density(&sine(20.0, 2.0, 250.0, 4000), 250.0);
        let resolution = estimate.frequencies[1];
        let total: f64 = estimate.powers.iter().sum::<f64>() * resolution;
        // A sine of amplitude 2 has power 2.
        assert!((total - 2.0).abs() < 0.2, "Integrated power {}", total);
    }

    #[test]
    fn test_nan_input_gives_nan_spectrum() {
        let estimator = WelchEstimator::default();
        let mut signal = sine(10.0, 1.0, 250.0, 500);
        signal[3] = f64::NAN;
        let estimate = estimator.power_spectral_density(&signal, 250.0);
        assert!(estimate.is_undefined());
    }

    #[test]
    fn test_short_input_single_segment() {
        let estimator = WelchEstimator::default();
        let estimate = estimator.power_spectral_density(&sine(10.0, 1.0, 250.0, 40), 250.0);
        assert_eq!(estimate.frequencies.len(), 257);
        assert!(estimate.powers.iter().all(|p| p.is_finite()));
    }
}
