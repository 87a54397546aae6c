//! Epoch-millisecond time base shared by host and clients.
//!
//! Every instant that crosses the wire (`/time` responses, `PLAY_AT`
//! frames) is milliseconds since the Unix epoch on the sender's clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current local time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    system_time_to_millis(SystemTime::now())
}

/// Convert a `SystemTime` to epoch milliseconds (negative before 1970).
#[must_use]
pub fn system_time_to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// Convert epoch milliseconds back to a `SystemTime`.
///
/// `None` if the platform cannot represent the instant.
#[must_use]
pub fn system_time_from_millis(millis: i64) -> Option<SystemTime> {
    let magnitude = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH.checked_add(magnitude)
    } else {
        UNIX_EPOCH.checked_sub(magnitude)
    }
}
