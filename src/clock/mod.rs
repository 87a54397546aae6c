//! Clock synchronization against the host.
//!
//! ## Sync Flow
//!
//! ```text
//! Client                            Host
//!   |--- GET /time (local_send) ------>|
//!   |<-- "1700000000123" --------------|  (local_receive)
//!   |                                  |
//!   |  rtt    = local_receive - local_send
//!   |  offset = local_receive - (remote + rtt / 2)
//! ```
//!
//! Repeated several times; the median offset wins.

pub mod estimator;
pub mod timestamp;

#[cfg(test)]
mod tests;

pub use estimator::{
    ClockOffset, ClockSample, ClockSync, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_INTERVAL,
    estimate_offset, median,
};
pub use timestamp::{now_millis, system_time_from_millis, system_time_to_millis};
