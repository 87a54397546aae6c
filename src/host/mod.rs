//! Host side of a synchronized session
//!
//! The host serves the payload and its clock over HTTP, tracks which
//! devices are ready through the control port, and fans out the shared
//! start instant.
//!
//! ```text
//! Client                           Host
//!   |--- GET /audio ---------------->|  record_contact
//!   |<-- WAV header + PCM -----------|
//!   |--- GET /time (x N) ----------->|
//!   |<-- epoch millis ---------------|
//!   |--- READY|<name> (udp) -------->|  mark_ready
//!   |                                |
//!   |<-- PLAY_AT|<instant> (udp) ----|  start_playback()
//! ```

mod control;
mod payload;
mod server;
mod session;

#[cfg(test)]
mod tests;

pub use payload::LoadedPayload;
pub use session::HostSession;
