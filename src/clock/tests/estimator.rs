use crate::clock::{ClockOffset, ClockSample, ClockSync, estimate_offset, median};
use crate::error::SyncError;

// ===== ClockSample =====

#[test]
fn test_sample_zero_offset_symmetric() {
    // Host and client agree; 10ms round trip, host answered at the midpoint.
    let sample = ClockSample::new(1_000, 1_005, 1_010);
    assert_eq!(sample.round_trip(), 10);
    assert_eq!(sample.offset(), Some(0));
}

#[test]
fn test_sample_positive_offset() {
    // Client is 50ms ahead of the host.
    let sample = ClockSample::new(10_050, 10_005, 10_060);
    assert_eq!(sample.offset(), Some(50));
}

#[test]
fn test_sample_negative_offset() {
    // Client is 200ms behind the host.
    let sample = ClockSample::new(5_000, 5_204, 5_008);
    assert_eq!(sample.offset(), Some(-200));
}

#[test]
fn test_sample_extreme_remote_has_no_offset() {
    let sample = ClockSample::new(1_000, i64::MIN, 1_010);
    assert_eq!(sample.offset(), None);

    let sample = ClockSample::new(1_000, i64::MAX, 1_010);
    assert_eq!(sample.offset(), None);
}

// ===== median =====

#[test]
fn test_median_rejects_outlier() {
    let mut offsets = vec![10, 12, 11, 500, 9];
    assert_eq!(median(&mut offsets), Some(11));
}

#[test]
fn test_median_even_count_takes_upper_middle() {
    let mut offsets = vec![4, 1, 3, 2];
    assert_eq!(median(&mut offsets), Some(3));
}

#[test]
fn test_median_empty() {
    assert_eq!(median(&mut []), None);
}

// ===== estimate_offset =====

#[test]
fn test_estimate_matches_arithmetic_offset_without_outliers() {
    // True offset +40ms, round trips jitter between 4 and 12ms.
    let true_offset = 40;
    let samples: Vec<ClockSample> = [4, 8, 12, 6, 10]
        .iter()
        .enumerate()
        .map(|(i, rtt)| {
            let send = 1_000_000 + i64::try_from(i).unwrap() * 100;
            let recv = send + rtt;
            let host_at_midpoint = send + rtt / 2 - true_offset;
            ClockSample::new(send, host_at_midpoint, recv)
        })
        .collect();

    let offset = estimate_offset(&samples).unwrap();
    assert!((offset.as_millis() - true_offset).abs() <= 6);
}

#[test]
fn test_estimate_ignores_single_delayed_packet() {
    let mut samples: Vec<ClockSample> = (0..4)
        .map(|i| ClockSample::new(i * 100, i * 100 + 2, i * 100 + 4))
        .collect();
    // One response stuck in a queue for 900ms after the host stamped it.
    samples.push(ClockSample::new(400, 402, 1_304));

    let offset = estimate_offset(&samples).unwrap();
    assert_eq!(offset, ClockOffset::ZERO);
}

#[test]
fn test_estimate_no_samples_fails() {
    let err = estimate_offset(&[]).unwrap_err();
    assert!(matches!(err, SyncError::InsufficientSamples { attempted: 0 }));
}

// ===== ClockOffset =====

#[test]
fn test_offset_translation() {
    let offset = ClockOffset::from_millis(50);
    assert_eq!(offset.to_local(10_000), Some(9_950));
    assert_eq!(offset.to_host(9_950), Some(10_000));
    assert_eq!(offset.to_string(), "+50ms");
    assert_eq!(ClockOffset::from_millis(-7).to_string(), "-7ms");
}

#[test]
fn test_offset_translation_out_of_range() {
    assert_eq!(ClockOffset::from_millis(-50).to_local(i64::MAX), None);
    assert_eq!(ClockOffset::from_millis(50).to_local(i64::MIN), None);
    assert_eq!(ClockOffset::from_millis(50).to_host(i64::MAX), None);
}

#[test]
fn test_estimate_skips_out_of_range_samples() {
    let samples = [
        ClockSample::new(0, 2, 4),
        ClockSample::new(100, i64::MIN, 104),
        ClockSample::new(200, 202, 204),
    ];
    assert_eq!(estimate_offset(&samples).unwrap(), ClockOffset::ZERO);

    let err = estimate_offset(&samples[1..2]).unwrap_err();
    assert!(matches!(err, SyncError::InsufficientSamples { attempted: 1 }));
}

// ===== ClockSync =====

#[test]
fn test_clock_sync_collects_and_finishes() {
    let mut sync = ClockSync::new();
    assert!(sync.add_sample(ClockSample::new(0, 5, 10)));
    sync.record_failure();
    assert!(sync.add_sample(ClockSample::new(100, 104, 120)));

    assert_eq!(sync.sample_count(), 2);
    assert_eq!(sync.attempts(), 3);
    assert_eq!(sync.round_trip_spread(), Some(10));
    assert!(sync.finish().is_ok());
}

#[test]
fn test_clock_sync_all_failed() {
    let mut sync = ClockSync::new();
    for _ in 0..5 {
        sync.record_failure();
    }
    let err = sync.finish().unwrap_err();
    assert!(matches!(err, SyncError::InsufficientSamples { attempted: 5 }));
    assert_eq!(sync.round_trip_spread(), None);
}

#[test]
fn test_clock_sync_out_of_range_sample_counts_as_failure() {
    let mut sync = ClockSync::new();
    assert!(!sync.add_sample(ClockSample::new(0, i64::MIN, 10)));
    assert!(sync.add_sample(ClockSample::new(100, 104, 108)));

    assert_eq!(sync.sample_count(), 1);
    assert_eq!(sync.attempts(), 2);
    assert_eq!(sync.finish().unwrap(), ClockOffset::ZERO);
}

#[test]
fn test_clock_sync_only_out_of_range_samples() {
    let mut sync = ClockSync::new();
    sync.add_sample(ClockSample::new(0, i64::MAX, 10));

    let err = sync.finish().unwrap_err();
    assert!(matches!(err, SyncError::InsufficientSamples { attempted: 1 }));
}
