//! Round-trip clock offset estimation.
//!
//! Each time query yields three timestamps: when the request left, the
//! host's reported time, and when the answer came back. Assuming a
//! symmetric path, the host's clock read `remote` at the midpoint of the
//! round trip, so at local receive time the host clock reads
//! `remote + rtt / 2`.

use std::fmt;
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Recommended number of time queries per sync session.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// Recommended spacing between time queries.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// One round-trip measurement against the host clock (epoch milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    /// Local time when the query was sent
    pub local_send: i64,
    /// Host time reported in the response
    pub remote: i64,
    /// Local time when the response arrived
    pub local_receive: i64,
}

impl ClockSample {
    /// Create a sample from its three timestamps.
    #[must_use]
    pub fn new(local_send: i64, remote: i64, local_receive: i64) -> Self {
        Self {
            local_send,
            remote,
            local_receive,
        }
    }

    /// Round-trip time in milliseconds.
    #[must_use]
    pub fn round_trip(&self) -> i64 {
        self.local_receive.saturating_sub(self.local_send)
    }

    /// Offset (local - host) implied by this sample alone.
    ///
    /// `None` if the host's reported time is so far out of range that the
    /// offset does not fit in an `i64`.
    #[must_use]
    pub fn offset(&self) -> Option<i64> {
        let estimated_host = self.remote.checked_add(self.round_trip() / 2)?;
        self.local_receive.checked_sub(estimated_host)
    }
}

/// Signed difference `local - host`, in milliseconds.
///
/// Positive means the local clock is ahead of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockOffset(i64);

impl ClockOffset {
    /// Zero offset.
    pub const ZERO: Self = Self(0);

    /// Create from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Offset in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Translate a host-clock instant into the local timeline.
    ///
    /// `None` if the result leaves the `i64` range.
    #[must_use]
    pub const fn to_local(self, host_millis: i64) -> Option<i64> {
        host_millis.checked_sub(self.0)
    }

    /// Translate a local instant into the host timeline.
    ///
    /// `None` if the result leaves the `i64` range.
    #[must_use]
    pub const fn to_host(self, local_millis: i64) -> Option<i64> {
        local_millis.checked_add(self.0)
    }
}

impl fmt::Display for ClockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}ms", self.0)
    }
}

/// Median of a set of values. Sorts in place.
///
/// For even counts the upper of the two middle values is returned.
#[must_use]
pub fn median(values: &mut [i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[values.len() / 2])
}

/// Estimate the clock offset from a batch of samples.
///
/// The median rejects a single delayed packet without an explicit
/// outlier filter.
///
/// Samples whose offset overflows are skipped.
///
/// # Errors
///
/// Returns `InsufficientSamples` if no sample yields an offset.
pub fn estimate_offset(samples: &[ClockSample]) -> Result<ClockOffset> {
    let mut offsets: Vec<i64> = samples.iter().filter_map(ClockSample::offset).collect();
    median(&mut offsets)
        .map(ClockOffset)
        .ok_or(SyncError::InsufficientSamples {
            attempted: samples.len(),
        })
}

/// Collects samples for one sync session.
#[derive(Debug, Clone, Default)]
pub struct ClockSync {
    samples: Vec<ClockSample>,
    attempts: usize,
}

impl ClockSync {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round trip. Returns `false`, counting it as a failed
    /// query, if the sample yields no usable offset.
    pub fn add_sample(&mut self, sample: ClockSample) -> bool {
        self.attempts += 1;
        let Some(offset) = sample.offset() else {
            tracing::debug!(remote = sample.remote, "Discarding out-of-range clock sample");
            return false;
        };
        tracing::trace!(rtt = sample.round_trip(), offset, "clock sample");
        self.samples.push(sample);
        true
    }

    /// Record a query that produced no sample.
    pub fn record_failure(&mut self) {
        self.attempts += 1;
    }

    /// Number of usable samples.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of queries attempted, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Collected samples in arrival order.
    #[must_use]
    pub fn samples(&self) -> &[ClockSample] {
        &self.samples
    }

    /// Spread between slowest and fastest round trip.
    #[must_use]
    pub fn round_trip_spread(&self) -> Option<i64> {
        let min = self.samples.iter().map(ClockSample::round_trip).min()?;
        let max = self.samples.iter().map(ClockSample::round_trip).max()?;
        Some(max.saturating_sub(min))
    }

    /// Produce the offset for this session.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientSamples` if every query failed.
    pub fn finish(&self) -> Result<ClockOffset> {
        if self.samples.is_empty() {
            return Err(SyncError::InsufficientSamples {
                attempted: self.attempts,
            });
        }
        estimate_offset(&self.samples)
    }
}
