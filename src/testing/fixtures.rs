//! Deterministic synthetic EEG for tests and offline harnesses.
//!
//! Signals are an alpha sine (random phase) plus uniform background noise,
//! both in volts, drawn from a seeded `StdRng` so every run sees the same
//! samples. Quality matrices are built alongside so calibration inputs can be
//! assembled without a headset.

use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

/// Default sampling rate of generated signals (Hz)
pub const FIXTURE_SAMPLE_RATE: f64 = 250.0;

/// Seeded generator of synthetic EEG channels.
#[derive(Debug, Clone, PartialEq)]
pub struct EegFixture {
    seed: u64,
    sample_rate: f64,
    alpha_frequency_hz: f64,
    alpha_amplitude: f64,
    noise_amplitude: f64,
}

impl EegFixture {
    /// 10 Hz alpha at 20 µV over 10 µV uniform noise, sampled at 250 Hz.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            sample_rate: FIXTURE_SAMPLE_RATE,
            alpha_frequency_hz: 10.0,
            alpha_amplitude: 20.0e-6,
            noise_amplitude: 10.0e-6,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_alpha_frequency(mut self, frequency_hz: f64) -> Self {
        self.alpha_frequency_hz = frequency_hz;
        self
    }

    /// Alpha sine amplitude in volts; zero gives noise only.
    pub fn with_alpha_amplitude(mut self, amplitude: f64) -> Self {
        self.alpha_amplitude = amplitude;
        self
    }

    pub fn with_noise_amplitude(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// One channel of `samples` values.
    pub fn channel(&self, samples: usize) -> Vec<f64> {
        self.generate(self.seed, samples)
    }

    /// Channels x samples recording of `packets` packets.
    ///
    /// Each channel draws from its own seed, so channels share the alpha
    /// frequency but not phase or noise.
    pub fn recording(&self, channels: usize, packets: usize, packet_length: usize) -> Array2<f64> {
        let samples = packets * packet_length;
        let mut recording = Array2::<f64>::zeros((channels, samples));
        for (index, mut row) in recording.rows_mut().into_iter().enumerate() {
            let channel_seed = self.seed.wrapping_add(0x9E37_79B9_u64.wrapping_mul(index as u64 + 1));
            for (target, value) in row.iter_mut().zip(self.generate(channel_seed, samples)) {
                *target = value;
            }
        }
        recording
    }

    fn generate(&self, seed: u64, samples: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let phase = rng.gen_range(0.0..2.0 * PI);
        let step = 2.0 * PI * self.alpha_frequency_hz / self.sample_rate;
        (0..samples)
            .map(|i| {
                let noise = if self.noise_amplitude > 0.0 {
                    rng.gen_range(-self.noise_amplitude..self.noise_amplitude)
                } else {
                    0.0
                };
                self.alpha_amplitude * (phase + step * i as f64).sin() + noise
            })
            .collect()
    }
}

/// Channels x packets quality matrix filled with `value`.
pub fn constant_quality(channels: usize, packets: usize, value: f64) -> Array2<f64> {
    Array2::from_elem((channels, packets), value)
}

#[cfg(test)]
mod tests;
