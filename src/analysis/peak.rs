// AlphaPeakDetector - individual alpha frequency (IAF) per channel
//
// Pipeline per channel:
// 1. Repair: interpolate gaps, remove DC, band-pass to the analysis band,
//    interpolate outliers, drop what could not be repaired
// 2. Welch PSD, truncated to the analysis band
// 3. Background noise floor (iterative regression, see `noise`)
// 4. difference = max(logPSD - floor, 0); candidate peaks are downward
//    zero-crossings of its derivative inside the search band
// 5. Disambiguation (single candidate, history-based condition D, highest
//    vs runner-up, centre of gravity weighted by the dB spectrum)
// 6. Peak bounds walked out to the noise floor, quality = area of the
//    difference between the bounds
//
// The frequency history is the only state that survives a call. It is
// appended to only when exactly one candidate was found.

use ndarray::ArrayView2;
use std::sync::Arc;

use crate::analysis::band::FrequencyBand;
use crate::analysis::conditioning::{drop_missing, SignalConditioner};
use crate::analysis::noise::{to_decibels, BackgroundNoiseEstimator};
use crate::analysis::spectrum::{SpectralEstimate, SpectralEstimator};
use crate::analysis::stats::{all_nan, gradient, mean, sample_std, trapz};
use crate::analysis::DspToolkit;

/// Entries needed before condition D is applied
const MIN_HISTORY_FOR_CONDITION_D: usize = 10;

/// Entries needed before highest-vs-runner-up and centre of gravity are trusted
const MIN_HISTORY_FOR_GROUPING: usize = 20;

/// The leading candidate must beat the runner-up by this ratio
const LEADER_RATIO: f64 = 0.8;

/// Margin (Hz) around the search band where peak bounds may extend
const BOUND_MARGIN_HZ: f64 = 2.0;

/// Append-only record of accepted single-peak frequencies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyHistory {
    values: Vec<f64>,
}

impl FrequencyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, frequency_hz: f64) {
        self.values.push(frequency_hz);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }

    /// Sample standard deviation, 0 below two entries
    pub fn std(&self) -> f64 {
        sample_std(&self.values)
    }
}

/// History mean and spread captured when a detection call starts
///
/// Condition D uses these values for every channel of the call, even after
/// an earlier channel appended to the history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HistoryStats {
    pub mean: f64,
    pub std: f64,
}

impl HistoryStats {
    pub fn of(history: &FrequencyHistory) -> Self {
        Self {
            mean: history.mean(),
            std: history.std(),
        }
    }
}

/// Result of the detector for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakEstimate {
    /// Peak frequency in Hz, NaN when no peak was found
    pub frequency: f64,
    /// Area of the peak above the noise floor; NaN for centre-of-gravity estimates
    pub quality: f64,
}

impl PeakEstimate {
    pub const UNDEFINED: PeakEstimate = PeakEstimate {
        frequency: f64::NAN,
        quality: f64::NAN,
    };

    pub fn is_defined(&self) -> bool {
        !self.frequency.is_nan()
    }
}

/// Outcome of candidate disambiguation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PeakSelection {
    None,
    /// One bin reported as the peak
    Single(usize),
    /// Several bins, highest first; reported through the centre of gravity
    Group(Vec<usize>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub bin: usize,
    pub frequency: f64,
    pub amplitude: f64,
}

/// Strongest amplitude and runner-up in scan order
///
/// A strictly greater value takes the lead and demotes the old leader; a
/// value strictly between the two becomes runner-up. Ties with the leader
/// leave the runner-up untouched.
pub(crate) fn leader_and_runner_up(candidates: &[Candidate]) -> (Option<Candidate>, f64) {
    let mut leader: Option<Candidate> = None;
    let mut first = 0.0;
    let mut second = 0.0;
    for candidate in candidates {
        if candidate.amplitude > first {
            second = first;
            first = candidate.amplitude;
            leader = Some(*candidate);
        } else if candidate.amplitude > second && first > candidate.amplitude {
            second = candidate.amplitude;
        }
    }
    (leader, second)
}

/// Spectrum truncated to the analysis band with its noise-floor residual
pub(crate) struct PeakSpectrum {
    pub frequencies: Vec<f64>,
    pub log_psd: Vec<f64>,
    pub noise: Vec<f64>,
    pub difference: Vec<f64>,
    pub derivative: Vec<f64>,
}

impl PeakSpectrum {
    /// Build from a full spectrum; `None` when no bin lies inside `analysis_band`
    pub fn new(
        estimate: &SpectralEstimate,
        analysis_band: FrequencyBand,
        noise_estimator: &BackgroundNoiseEstimator,
    ) -> Option<Self> {
        let (first, last) = analysis_band.index_bounds(&estimate.frequencies)?;
        let truncated = estimate.slice(first, last);

        let noise = noise_estimator.estimate(&truncated.frequencies, &truncated.powers);
        let log_psd = to_decibels(&truncated.powers);
        // NaN residuals (unusable bins) count as "no excess power".
        let difference: Vec<f64> = log_psd
            .iter()
            .zip(&noise)
            .map(|(p, n)| {
                let d = p - n;
                if d > 0.0 {
                    d
                } else {
                    0.0
                }
            })
            .collect();
        let derivative = gradient(&difference);

        Some(Self {
            frequencies: truncated.frequencies,
            log_psd,
            noise,
            difference,
            derivative,
        })
    }

    fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Downward zero-crossings of the derivative around the search band
    pub fn candidates(&self, search_band: FrequencyBand) -> Vec<Candidate> {
        let Some((first, last)) = search_band.index_bounds(&self.frequencies) else {
            return Vec::new();
        };
        let d1 = &self.derivative;
        let start = first.saturating_sub(1);
        let end = (last + 1).min(self.len().saturating_sub(1));

        (start..end)
            .filter(|&k| (d1[k] == 0.0 && d1[k + 1] < 0.0) || (d1[k] > 0.0 && d1[k + 1] <= 0.0))
            .map(|k| {
                let bin = if self.difference[k + 1] > self.difference[k] {
                    k + 1
                } else {
                    k
                };
                Candidate {
                    bin,
                    frequency: self.frequencies[bin],
                    amplitude: self.difference[bin],
                }
            })
            .collect()
    }

    /// Decide which candidate(s) describe the alpha peak
    ///
    /// Size checks read the live history; the condition D window comes from
    /// `stats`, taken at the start of the call.
    pub fn select(
        candidates: &[Candidate],
        history: &mut FrequencyHistory,
        stats: HistoryStats,
    ) -> PeakSelection {
        match candidates {
            [] => PeakSelection::None,
            [only] => {
                history.push(only.frequency);
                PeakSelection::Single(only.bin)
            }
            _ => {
                let usual: Vec<Candidate> = if history.len() >= MIN_HISTORY_FOR_CONDITION_D {
                    let (mu, sigma) = (stats.mean, stats.std);
                    let (low, high) = ((mu - sigma).floor(), (mu + sigma).ceil());
                    candidates
                        .iter()
                        .filter(|c| c.frequency >= low && c.frequency <= high)
                        .copied()
                        .collect()
                } else {
                    Vec::new()
                };

                match usual.as_slice() {
                    [only] => PeakSelection::Single(only.bin),
                    [] => {
                        let mature = history.len() >= MIN_HISTORY_FOR_GROUPING;
                        match leader_and_runner_up(candidates) {
                            (Some(leader), second)
                                if leader.amplitude * LEADER_RATIO > second && mature =>
                            {
                                PeakSelection::Single(leader.bin)
                            }
                            _ if mature => PeakSelection::Group(descending_bins(candidates)),
                            (Some(leader), _) => PeakSelection::Single(leader.bin),
                            (None, _) => PeakSelection::None,
                        }
                    }
                    _ => match leader_and_runner_up(&usual) {
                        (Some(leader), second) if leader.amplitude * LEADER_RATIO > second => {
                            PeakSelection::Single(leader.bin)
                        }
                        _ => PeakSelection::Group(descending_bins(&usual)),
                    },
                }
            }
        }
    }

    /// Bins `(min1, min2)` delimiting the peak or peak group
    ///
    /// `lowest` and `highest` are the extreme candidate bins.
    pub fn peak_bounds(&self, lowest: usize, highest: usize, search_band: FrequencyBand) -> (usize, usize) {
        let len = self.len() as isize;
        let d1 = &self.derivative;
        let diff = &self.difference;
        let distance = |i: isize| (self.log_psd[i as usize] - self.noise[i as usize]).abs();

        let guard = search_band.widened(BOUND_MARGIN_HZ);
        let (guard_first, guard_last) = guard
            .index_bounds(&self.frequencies)
            .map_or((0, len - 1), |(f, l)| (f as isize, l as isize));
        let guard_before = guard_first - 1;
        let guard_after = guard_last + 1;

        let bin_beg = lowest as isize;
        let bin_end = highest as isize;

        // Closest noise-floor crossing before the lowest candidate.
        let crossing_before = (1..len)
            .filter(|&cc| cc <= bin_beg - 1 && diff[cc as usize] == 0.0)
            .last();
        let mut cross_before = match crossing_before {
            Some(cc) if cc != bin_beg - 1 => {
                let c = distance(cc);
                let b = distance(cc - 1);
                let a = distance(cc + 1);
                if b <= c && b <= a {
                    cc - 1
                } else if a < c && a < b {
                    cc + 1
                } else {
                    cc
                }
            }
            Some(cc) => cc,
            None => guard_before,
        };
        if crossing_before.is_none() || cross_before < guard_before {
            cross_before = guard_before;
        }

        // First local minimum walking down from the lowest candidate.
        let mut min1 = cross_before;
        let mut k = bin_beg - 1;
        while k >= cross_before + 1 && k >= 1 {
            let (dk, dprev) = (d1[k as usize], d1[(k - 1) as usize]);
            if (dk == 0.0 && dprev < 0.0) || (dk > 0.0 && dprev <= 0.0) {
                min1 = if diff[(k - 1) as usize] > diff[k as usize] { k } else { k - 1 };
                break;
            }
            k -= 1;
        }

        // Closest noise-floor crossing after the highest candidate.
        let crossing_after = (1..len)
            .find(|&cc| cc >= bin_end + 1 && diff[cc as usize] == 0.0)
            .filter(|&cc| cc < len - 1);
        let mut cross_after = match crossing_after {
            Some(cc) if cc != bin_end + 1 => {
                let b = distance(cc - 1);
                let c = distance(cc);
                let a = distance(cc + 1);
                if b <= c && b <= a {
                    cc - 1
                } else if a < c && a < b {
                    cc + 1
                } else {
                    cc
                }
            }
            Some(cc) => cc,
            None => guard_after,
        };
        if crossing_after.is_none() || cross_after > guard_after {
            cross_after = guard_after;
        }

        // First local minimum walking up from the highest candidate.
        let mut min2 = cross_after;
        let mut k = bin_end + 1;
        while k <= cross_after - 1 && k + 1 < len {
            let (dk, dnext) = (d1[k as usize], d1[(k + 1) as usize]);
            if (dnext == 0.0 && dk < 0.0) || (dnext > 0.0 && dk <= 0.0) {
                min2 = if diff[k as usize] > diff[(k + 1) as usize] { k + 1 } else { k };
                break;
            }
            k += 1;
        }

        let min1 = min1.clamp(0, len - 1) as usize;
        let min2 = min2.clamp(0, len - 1) as usize;
        (min1.min(min2), min1.max(min2))
    }

    /// Turn a selection into a frequency and quality
    pub fn estimate(&self, selection: &PeakSelection, search_band: FrequencyBand) -> PeakEstimate {
        match selection {
            PeakSelection::None => PeakEstimate::UNDEFINED,
            PeakSelection::Single(bin) => {
                let (min1, min2) = self.peak_bounds(*bin, *bin, search_band);
                PeakEstimate {
                    frequency: self.frequencies[*bin],
                    quality: trapz(
                        &self.frequencies[min1..=min2],
                        &self.difference[min1..=min2],
                    ),
                }
            }
            PeakSelection::Group(bins) => {
                let (Some(&highest), Some(&lowest)) = (bins.first(), bins.last()) else {
                    return PeakEstimate::UNDEFINED;
                };
                let (min1, min2) = self.peak_bounds(lowest, highest, search_band);
                let (weighted, total) = (min1..=min2)
                    .filter(|&i| self.log_psd[i].is_finite())
                    .fold((0.0, 0.0), |(w, t), i| {
                        (w + self.log_psd[i] * self.frequencies[i], t + self.log_psd[i])
                    });
                if total == 0.0 || !(weighted / total).is_finite() {
                    return PeakEstimate::UNDEFINED;
                }
                let centre = weighted / total;
                let nearest = self
                    .frequencies
                    .iter()
                    .copied()
                    .min_by(|a, b| (a - centre).abs().total_cmp(&(b - centre).abs()))
                    .unwrap_or(f64::NAN);
                PeakEstimate {
                    frequency: nearest,
                    quality: f64::NAN,
                }
            }
        }
    }
}

fn descending_bins(candidates: &[Candidate]) -> Vec<usize> {
    let mut bins: Vec<usize> = candidates.iter().map(|c| c.bin).collect();
    bins.sort_unstable_by(|a, b| b.cmp(a));
    bins
}

/// Per-channel individual alpha frequency detector
pub struct AlphaPeakDetector {
    conditioner: Arc<dyn SignalConditioner>,
    estimator: Arc<dyn SpectralEstimator>,
    noise: BackgroundNoiseEstimator,
    sample_rate: f64,
    analysis_band: FrequencyBand,
}

impl AlphaPeakDetector {
    /// Create a detector
    ///
    /// # Arguments
    /// * `sample_rate` - Sampling rate of the signals (Hz)
    /// * `analysis_band` - Band kept after filtering (typically 2-30 Hz)
    /// * `toolkit` - Conditioning and spectral collaborators
    pub fn new(sample_rate: f64, analysis_band: FrequencyBand, toolkit: &DspToolkit) -> Self {
        Self {
            conditioner: Arc::clone(&toolkit.conditioner),
            estimator: Arc::clone(&toolkit.estimator),
            noise: BackgroundNoiseEstimator::new(),
            sample_rate,
            analysis_band,
        }
    }

    /// Repair a raw channel; `None` when nothing usable remains
    fn prepare(&self, signal: &[f64]) -> Option<Vec<f64>> {
        if all_nan(signal) {
            return None;
        }
        let repaired = drop_missing(&self.conditioner.interpolate_missing(signal));
        let centred = self.conditioner.remove_dc(&repaired);
        let filtered = self
            .conditioner
            .band_pass(&centred, self.sample_rate, self.analysis_band);
        let cleaned = self.conditioner.interpolate_outliers(&filtered);
        if all_nan(&cleaned) {
            return None;
        }
        Some(drop_missing(&cleaned))
    }

    /// Peak search on an already computed spectrum
    pub(crate) fn analyse_spectrum(
        &self,
        estimate: &SpectralEstimate,
        search_band: FrequencyBand,
        history: &mut FrequencyHistory,
    ) -> PeakEstimate {
        let stats = HistoryStats::of(history);
        self.analyse_spectrum_with(estimate, search_band, history, stats)
    }

    /// Peak search with the history statistics of the enclosing call
    pub(crate) fn analyse_spectrum_with(
        &self,
        estimate: &SpectralEstimate,
        search_band: FrequencyBand,
        history: &mut FrequencyHistory,
        stats: HistoryStats,
    ) -> PeakEstimate {
        if estimate.is_undefined() {
            return PeakEstimate::UNDEFINED;
        }
        let Some(spectrum) = PeakSpectrum::new(estimate, self.analysis_band, &self.noise) else {
            return PeakEstimate::UNDEFINED;
        };
        let candidates = spectrum.candidates(search_band);
        let selection = PeakSpectrum::select(&candidates, history, stats);
        spectrum.estimate(&selection, search_band)
    }

    fn detect_with(
        &self,
        signal: &[f64],
        search_band: FrequencyBand,
        history: &mut FrequencyHistory,
        stats: HistoryStats,
    ) -> PeakEstimate {
        let Some(cleaned) = self.prepare(signal) else {
            return PeakEstimate::UNDEFINED;
        };
        let estimate = self
            .estimator
            .power_spectral_density(&cleaned, self.sample_rate);
        self.analyse_spectrum_with(&estimate, search_band, history, stats)
    }

    /// Detect the alpha peak of one channel
    ///
    /// # Arguments
    /// * `signal` - Raw samples, NaN marks missing data
    /// * `search_band` - Band where candidate peaks are looked for
    /// * `history` - Frequency history, appended to on single-candidate hits
    pub fn detect(
        &self,
        signal: &[f64],
        search_band: FrequencyBand,
        history: &mut FrequencyHistory,
    ) -> PeakEstimate {
        let stats = HistoryStats::of(history);
        self.detect_with(signal, search_band, history, stats)
    }

    /// Detect the alpha peak of every channel (rows) of a recording
    ///
    /// Every channel sees the condition D window of the history as it was
    /// when the call started; single-peak hits are still appended in row order.
    pub fn detect_channels(
        &self,
        recording: ArrayView2<f64>,
        search_band: FrequencyBand,
        history: &mut FrequencyHistory,
    ) -> Vec<PeakEstimate> {
        let stats = HistoryStats::of(history);
        recording
            .rows()
            .into_iter()
            .map(|row| {
                let samples = row.to_vec();
                self.detect_with(&samples, search_band, history, stats)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
