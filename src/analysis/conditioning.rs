// Signal conditioning - DC removal, band-pass, outlier and gap repair
//
// The spectral stages only depend on the `SignalConditioner` trait. The
// default `StandardConditioner` keeps every operation NaN-aware: missing
// samples never poison their neighbours, and the band-pass restores NaN at
// the positions where the input had it.
//
// Band-pass = 4th order Butterworth high-pass + 4th order Butterworth
// low-pass, each built from two RBJ biquad sections and run forward then
// backward (zero phase).

use std::f64::consts::PI;

use crate::analysis::band::FrequencyBand;

/// Pole quality factors of a 4th order Butterworth response split in two biquads
const BUTTERWORTH_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_6];

/// Interquartile multiplier for outlier bounds
const OUTLIER_IQR_FACTOR: f64 = 1.5;

/// Preprocessing primitives used by the peak detector and band power computer
pub trait SignalConditioner: Send + Sync {
    /// Subtract the mean of the present samples; NaN stays NaN
    fn remove_dc(&self, signal: &[f64]) -> Vec<f64>;

    /// Zero-phase band-pass; output has the input length and NaN positions
    fn band_pass(&self, signal: &[f64], sample_rate: f64, band: FrequencyBand) -> Vec<f64>;

    /// Replace samples outside the quartile fences by linear interpolation
    fn interpolate_outliers(&self, signal: &[f64]) -> Vec<f64>;

    /// Linearly interpolate interior NaN runs; edge NaN runs stay NaN
    fn interpolate_missing(&self, signal: &[f64]) -> Vec<f64>;
}

/// Second order IIR section, `a0` normalised to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    /// Feedforward coefficients b0,b1,b2
    pub b: [f64; 3],
    /// Feedback coefficients a1,a2
    pub a: [f64; 2],
}

impl Biquad {
    pub fn low_pass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(cutoff_hz, q, sample_rate);
        let b1 = 1.0 - cos_w0;
        Self::normalized([b1 * 0.5, b1, b1 * 0.5], [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha])
    }

    pub fn high_pass(cutoff_hz: f64, q: f64, sample_rate: f64) -> Self {
        let (cos_w0, alpha) = Self::prewarp(cutoff_hz, q, sample_rate);
        let b1 = -(1.0 + cos_w0);
        Self::normalized(
            [-b1 * 0.5, b1, -b1 * 0.5],
            [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha],
        )
    }

    fn prewarp(cutoff_hz: f64, q: f64, sample_rate: f64) -> (f64, f64) {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        let a0 = a[0];
        Self {
            b: [b[0] / a0, b[1] / a0, b[2] / a0],
            a: [a[1] / a0, a[2] / a0],
        }
    }

    /// Direct form I over the whole buffer, zero initial state
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let (mut x1, mut x2, mut y1, mut y2) = (0.0, 0.0, 0.0, 0.0);
        input
            .iter()
            .map(|&x0| {
                let y0 = self.b[0] * x0 + self.b[1] * x1 + self.b[2] * x2
                    - self.a[0] * y1
                    - self.a[1] * y2;
                x2 = x1;
                x1 = x0;
                y2 = y1;
                y1 = y0;
                y0
            })
            .collect()
    }
}

/// Default conditioner
#[derive(Debug, Clone, Default)]
pub struct StandardConditioner;

impl StandardConditioner {
    pub fn new() -> Self {
        Self
    }

    /// Sections implementing the band-pass at this sample rate
    ///
    /// A corner at or below 0 Hz drops the high-pass; a corner at or above
    /// Nyquist drops the low-pass.
    fn band_pass_sections(sample_rate: f64, band: FrequencyBand) -> Vec<Biquad> {
        let nyquist = sample_rate / 2.0;
        let mut sections = Vec::with_capacity(4);
        if band.low_hz > 0.0 && band.low_hz < nyquist {
            sections.extend(
                BUTTERWORTH_Q
                    .iter()
                    .map(|&q| Biquad::high_pass(band.low_hz, q, sample_rate)),
            );
        }
        if band.high_hz > 0.0 && band.high_hz < nyquist {
            sections.extend(
                BUTTERWORTH_Q
                    .iter()
                    .map(|&q| Biquad::low_pass(band.high_hz, q, sample_rate)),
            );
        }
        sections
    }

    /// Forward-backward filtering with odd reflection padding at both ends
    fn zero_phase(sections: &[Biquad], signal: &[f64], pad: usize) -> Vec<f64> {
        let n = signal.len();
        let pad = pad.min(n.saturating_sub(1));
        let first = signal[0];
        let last = signal[n - 1];

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        let mut buffer = extended;
        for section in sections {
            buffer = section.filter(&buffer);
        }
        buffer.reverse();
        for section in sections {
            buffer = section.filter(&buffer);
        }
        buffer.reverse();

        buffer[pad..pad + n].to_vec()
    }
}

impl SignalConditioner for StandardConditioner {
    fn remove_dc(&self, signal: &[f64]) -> Vec<f64> {
        let (sum, count) = signal
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
        if count == 0 {
            return signal.to_vec();
        }
        let offset = sum / count as f64;
        signal.iter().map(|v| v - offset).collect()
    }

    fn band_pass(&self, signal: &[f64], sample_rate: f64, band: FrequencyBand) -> Vec<f64> {
        if signal.iter().all(|v| v.is_nan()) {
            return signal.to_vec();
        }

        // Filter a gap-free copy, then put the gaps back.
        let mut filled = self.interpolate_missing(signal);
        hold_edges(&mut filled);

        let sections = Self::band_pass_sections(sample_rate, band);
        if sections.is_empty() {
            return signal.to_vec();
        }
        let pad = sample_rate.max(1.0) as usize;
        let mut filtered = Self::zero_phase(&sections, &filled, pad);

        for (out, &original) in filtered.iter_mut().zip(signal) {
            if original.is_nan() {
                *out = f64::NAN;
            }
        }
        filtered
    }

    fn interpolate_outliers(&self, signal: &[f64]) -> Vec<f64> {
        let mut present: Vec<f64> = signal.iter().copied().filter(|v| !v.is_nan()).collect();
        if present.len() < 4 {
            return signal.to_vec();
        }
        present.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile_sorted(&present, 0.25);
        let q3 = quantile_sorted(&present, 0.75);
        let iqr = q3 - q1;
        let lower = q1 - OUTLIER_IQR_FACTOR * iqr;
        let upper = q3 + OUTLIER_IQR_FACTOR * iqr;

        let flagged: Vec<f64> = signal
            .iter()
            .map(|&v| if v < lower || v > upper { f64::NAN } else { v })
            .collect();
        self.interpolate_missing(&flagged)
    }

    fn interpolate_missing(&self, signal: &[f64]) -> Vec<f64> {
        let mut output = signal.to_vec();
        let mut previous: Option<usize> = None;
        for i in 0..signal.len() {
            if signal[i].is_nan() {
                continue;
            }
            if let Some(p) = previous {
                if i > p + 1 {
                    let span = (i - p) as f64;
                    for (k, slot) in output.iter_mut().enumerate().take(i).skip(p + 1) {
                        let t = (k - p) as f64 / span;
                        *slot = signal[p] + t * (signal[i] - signal[p]);
                    }
                }
            }
            previous = Some(i);
        }
        output
    }
}

/// Replace leading/trailing NaN runs with the nearest present sample
fn hold_edges(signal: &mut [f64]) {
    let Some(first) = signal.iter().position(|v| !v.is_nan()) else {
        return;
    };
    let Some(last) = signal.iter().rposition(|v| !v.is_nan()) else {
        return;
    };
    let (head, tail) = (signal[first], signal[last]);
    signal[..first].iter_mut().for_each(|v| *v = head);
    signal[last + 1..].iter_mut().for_each(|v| *v = tail);
}

/// Linear-interpolated quantile of an ascending slice
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Drop NaN samples, keeping the order of the rest
pub fn drop_missing(signal: &[f64]) -> Vec<f64> {
    signal.iter().copied().filter(|v| !v.is_nan()).collect()
}
