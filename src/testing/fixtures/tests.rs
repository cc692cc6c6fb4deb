use super::*;

#[test]
fn same_seed_same_samples() {
    let a = EegFixture::new(17).channel(500);
    let b = EegFixture::new(17).channel(500);
    let c = EegFixture::new(18).channel(500);

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn channel_stays_within_amplitude_envelope() {
    let fixture = EegFixture::new(1);
    let limit = 20.0e-6 + 10.0e-6;
    assert!(fixture.channel(1000).iter().all(|v| v.abs() <= limit));
}

#[test]
fn noise_free_fixture_is_pure_sine() {
    let signal = EegFixture::new(2)
        .with_noise_amplitude(0.0)
        .with_alpha_amplitude(1.0)
        .channel(250);
    // 10 Hz at 250 Hz repeats every 25 samples.
    for i in 0..(250 - 25) {
        assert!((signal[i] - signal[i + 25]).abs() < 1e-9);
    }
}

#[test]
fn recording_shape_and_distinct_channels() {
    let recording = EegFixture::new(3).recording(2, 4, 250);
    assert_eq!(recording.dim(), (2, 1000));
    assert_ne!(recording.row(0), recording.row(1));
}

#[test]
fn constant_quality_fills_matrix() {
    let qualities = constant_quality(3, 5, 0.5);
    assert_eq!(qualities.dim(), (3, 5));
    assert!(qualities.iter().all(|&q| q == 0.5));
}
