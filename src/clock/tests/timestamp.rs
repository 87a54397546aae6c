use std::time::{Duration, UNIX_EPOCH};

use crate::clock::{now_millis, system_time_from_millis, system_time_to_millis};

#[test]
fn test_now_millis_is_recent() {
    // 2023-01-01T00:00:00Z
    assert!(now_millis() > 1_672_531_200_000);
}

#[test]
fn test_millis_conversion() {
    let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
    assert_eq!(system_time_to_millis(t), 1_700_000_000_123);
    assert_eq!(system_time_from_millis(1_700_000_000_123), Some(t));
}

#[test]
fn test_millis_before_epoch() {
    let t = system_time_from_millis(-1_500).unwrap();
    assert_eq!(system_time_to_millis(t), -1_500);
}
