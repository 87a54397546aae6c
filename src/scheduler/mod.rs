//! Precise one-shot triggers.
//!
//! A trigger is a wall-clock instant plus an action. The waiting thread
//! sleeps coarsely until the instant is `precision_margin` away, then
//! spins on the clock until the instant passes. The spin keeps start
//! jitter well below the OS sleep granularity at the cost of one core for
//! the length of the margin.
//!
//! Each trigger runs on its own OS thread so the spin never shares an
//! executor with the async listeners.

mod trigger;

#[cfg(test)]
mod tests;

pub use trigger::{
    CancelFlag, DEFAULT_PRECISION_MARGIN, SchedulerConfig, TriggerHandle, TriggerOutcome,
    TriggerScheduler, wait_and_run,
};
