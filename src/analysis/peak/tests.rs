use super::*;
use crate::testing::fixtures::EegFixture;

const FS: f64 = 250.0;

/// Spectrum on the default Welch axis: 100/f background plus Gaussian bumps
fn synthetic_spectrum(bumps: &[(f64, f64, f64)]) -> SpectralEstimate {
    let frequencies: Vec<f64> = (0..=256).map(|k| k as f64 * FS / 512.0).collect();
    let powers = frequencies
        .iter()
        .map(|&f| {
            let background = if f > 0.0 { 100.0 / f } else { 100.0 };
            let peaks: f64 = bumps
                .iter()
                .map(|&(centre, width, height)| {
                    height * (-(f - centre) * (f - centre) / (2.0 * width * width)).exp()
                })
                .sum();
            background + peaks
        })
        .collect();
    SpectralEstimate {
        frequencies,
        powers,
    }
}

fn detector() -> AlphaPeakDetector {
    AlphaPeakDetector::new(FS, FrequencyBand::ANALYSIS, &DspToolkit::default())
}

fn candidate(bin: usize, amplitude: f64) -> Candidate {
    Candidate {
        bin,
        frequency: bin as f64,
        amplitude,
    }
}

#[test]
fn test_leader_and_runner_up_ordering() {
    let (leader, second) = leader_and_runner_up(&[
        candidate(1, 3.0),
        candidate(2, 5.0),
        candidate(3, 4.0),
    ]);
    assert_eq!(leader.map(|c| c.bin), Some(2));
    assert_eq!(second, 4.0);
}

#[test]
fn test_leader_and_runner_up_tie_keeps_runner_up() {
    // An equal second value never becomes runner-up.
    let (leader, second) = leader_and_runner_up(&[candidate(1, 5.0), candidate(2, 5.0)]);
    assert_eq!(leader.map(|c| c.bin), Some(1));
    assert_eq!(second, 0.0);
}

#[test]
fn test_single_clear_peak() {
    let detector = detector();
    let mut history = FrequencyHistory::new();
    let spectrum = synthetic_spectrum(&[(10.0, 2.0, 50.0)]);

    let estimate = detector.analyse_spectrum(&spectrum, FrequencyBand::SEARCH, &mut history);

    assert!(
        (estimate.frequency - 10.0).abs() < 0.5,
        "Expected IAF near 10 Hz, got {}",
        estimate.frequency
    );
    assert!(estimate.quality > 0.0, "Quality should be positive: {}", estimate.quality);
    assert_eq!(history.len(), 1, "Single-candidate hit should be recorded");
    assert_eq!(history.values()[0], estimate.frequency);
}

#[test]
fn test_condition_d_picks_usual_peak_without_recording() {
    let detector = detector();
    let mut history =
        FrequencyHistory::from_values((0..10).map(|i| if i % 2 == 0 { 9.5 } else { 10.5 }).collect());
    let spectrum = synthetic_spectrum(&[(7.0, 0.6, 50.0), (10.0, 0.6, 50.0)]);

    let estimate = detector.analyse_spectrum(&spectrum, FrequencyBand::SEARCH, &mut history);

    assert!(
        (estimate.frequency - 10.0).abs() < 0.5,
        "Condition D should favour the 10 Hz peak, got {}",
        estimate.frequency
    );
    assert_eq!(history.len(), 10, "Multi-candidate branches never append");
}

#[test]
fn test_centre_of_gravity_for_comparable_peaks() {
    let detector = detector();
    // Mature history far from both candidates: condition D keeps nothing.
    let mut history = FrequencyHistory::from_values(vec![20.0; 20]);
    let spectrum = synthetic_spectrum(&[(8.0, 0.6, 50.0), (11.0, 0.6, 50.0)]);

    let estimate = detector.analyse_spectrum(&spectrum, FrequencyBand::SEARCH, &mut history);

    // dB-weighted centre over [3.906, 15.137] Hz is 9.113 Hz, nearest bin 19.
    let bin_19 = 19.0 * FS / 512.0;
    assert!(
        (estimate.frequency - bin_19).abs() < 1e-9,
        "Centre of gravity should land on {} Hz, got {}",
        bin_19,
        estimate.frequency
    );
    assert!(estimate.quality.is_nan(), "Group estimates carry no quality");
    assert_eq!(history.len(), 20);
}

fn candidate_at(bin: usize, amplitude: f64) -> Candidate {
    Candidate {
        bin,
        frequency: bin as f64 * FS / 512.0,
        amplitude,
    }
}

#[test]
fn test_condition_d_window_uses_call_start_statistics() {
    let mut history = FrequencyHistory::from_values(vec![21.0 * FS / 512.0; 10]);
    let stats = HistoryStats::of(&history);
    // An earlier channel of the same call accepted a 12.7 Hz peak.
    history.push(12.7);

    // 9.77 Hz and 10.74 Hz: only the latter lies in [10, 11].
    let candidates = [candidate_at(20, 4.0), candidate_at(22, 3.0)];
    let selection = PeakSpectrum::select(&candidates, &mut history, stats);

    assert_eq!(selection, PeakSelection::Single(22));
    assert_eq!(history.len(), 11);

    // The live statistics widen the window to [9, 12] and the louder 9.77 Hz wins.
    let live = HistoryStats::of(&history);
    let selection = PeakSpectrum::select(&candidates, &mut history, live);
    assert_eq!(selection, PeakSelection::Single(20));
}

#[test]
fn test_second_channel_ignores_first_channel_hit() {
    let detector = detector();
    let seeded = FrequencyHistory::from_values(vec![21.0 * FS / 512.0; 10]);
    let first = synthetic_spectrum(&[(12.7, 0.6, 50.0)]);
    let second = synthetic_spectrum(&[(9.0, 0.6, 50.0), (10.7, 0.6, 50.0)]);

    let mut shared = seeded.clone();
    let stats = HistoryStats::of(&shared);
    detector.analyse_spectrum_with(&first, FrequencyBand::SEARCH, &mut shared, stats);
    let in_call = detector.analyse_spectrum_with(&second, FrequencyBand::SEARCH, &mut shared, stats);

    let mut alone = seeded.clone();
    let standalone = detector.analyse_spectrum(&second, FrequencyBand::SEARCH, &mut alone);

    assert_eq!(in_call.frequency, standalone.frequency);
    assert!(
        (in_call.frequency - 10.742).abs() < 0.01,
        "Expected the usual 10.7 Hz peak, got {}",
        in_call.frequency
    );
}

#[test]
fn test_undefined_spectrum() {
    let detector = detector();
    let mut history = FrequencyHistory::new();
    let mut spectrum = synthetic_spectrum(&[]);
    spectrum.powers.iter_mut().for_each(|p| *p = f64::NAN);

    let estimate = detector.analyse_spectrum(&spectrum, FrequencyBand::SEARCH, &mut history);
    assert!(!estimate.is_defined());
    assert!(estimate.quality.is_nan());
    assert!(history.is_empty());
}

#[test]
fn test_all_nan_channel_short_circuits() {
    let detector = detector();
    let mut history = FrequencyHistory::from_values(vec![10.0]);
    let estimate = detector.detect(&vec![f64::NAN; 2000], FrequencyBand::SEARCH, &mut history);

    assert!(estimate.frequency.is_nan());
    assert!(estimate.quality.is_nan());
    assert_eq!(history.len(), 1, "History must not change");
}

#[test]
fn test_detect_synthetic_alpha() {
    let detector = detector();
    let mut history = FrequencyHistory::new();
    let signal = EegFixture::new(7).channel(2000);

    let estimate = detector.detect(&signal, FrequencyBand::SEARCH, &mut history);

    assert!(
        (estimate.frequency - 10.0).abs() < 1.0,
        "Expected IAF near 10 Hz, got {}",
        estimate.frequency
    );
}

#[test]
fn test_detect_tolerates_gaps() {
    let detector = detector();
    let mut history = FrequencyHistory::new();
    let mut signal = EegFixture::new(11).channel(2000);
    signal[300..340].iter_mut().for_each(|v| *v = f64::NAN);
    signal[..5].iter_mut().for_each(|v| *v = f64::NAN);

    let estimate = detector.detect(&signal, FrequencyBand::SEARCH, &mut history);

    assert!(
        (estimate.frequency - 10.0).abs() < 1.0,
        "Gaps should be repaired, got {}",
        estimate.frequency
    );
}

#[test]
fn test_detect_channels_one_estimate_per_row() {
    let detector = detector();
    let mut history = FrequencyHistory::new();
    let mut recording = EegFixture::new(3).recording(2, 8, 250);
    recording.row_mut(1).fill(f64::NAN);

    let estimates = detector.detect_channels(recording.view(), FrequencyBand::SEARCH, &mut history);

    assert_eq!(estimates.len(), 2);
    assert!(estimates[0].is_defined());
    assert!(!estimates[1].is_defined());
}

#[test]
fn test_history_statistics() {
    let history = FrequencyHistory::from_values(vec![9.0, 10.0, 11.0]);
    assert_eq!(history.mean(), 10.0);
    assert!((history.std() - 1.0).abs() < 1e-12);
    assert_eq!(FrequencyHistory::from_values(vec![9.0]).std(), 0.0);
}
