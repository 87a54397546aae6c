//! # synccast
//!
//! Synchronized audio playback across devices on a local network.
//!
//! One device acts as the host: it serves an audio payload over HTTP,
//! answers clock queries, tracks which clients are ready, and announces a
//! shared start instant. Clients download the payload, estimate their clock
//! offset to the host, report readiness, and start playback at the
//! announced instant translated into their own clock.
//!
//! ## Features
//!
//! - Median-of-samples clock offset estimation
//! - Plain-text control datagrams (`READY`, `PLAY_AT`)
//! - Device registry with change notifications
//! - Sleep-then-spin trigger scheduler with cancellation
//! - Host and client session state machines
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use synccast::{ClientConfig, ClientSession};
//!
//! # async fn example() -> synccast::Result<()> {
//! let client = ClientSession::new(ClientConfig::with_name("Kitchen"));
//! let offset = client
//!     .connect(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)))
//!     .await?;
//! println!("host clock offset {offset}");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Sessions**: [`HostSession`] and [`ClientSession`] own the sockets
//!   and drive the workflow
//! - **Coordination**: [`DeviceRegistry`], [`TriggerScheduler`], events
//! - **Protocol**: sans-IO codecs for control datagrams, the WAV header
//!   and `/info`; HTTP runs on `axum` (host) and `reqwest` (client)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// State management
pub mod state;
/// Core types
pub mod types;

pub mod audio;
pub mod client;
pub mod clock;
pub mod host;
pub mod protocol;
pub mod registry;
pub mod scheduler;

// Re-exports
pub use audio::{AudioSink, DecodedAudio, NullSink, PayloadDecoder, WavDecoder};
pub use client::{ClientSession, HostTransport, HttpTransport};
pub use clock::{ClockOffset, ClockSample, estimate_offset};
pub use error::{Result, SyncError};
pub use host::{HostSession, LoadedPayload};
pub use protocol::{ControlMessage, PayloadInfo};
pub use registry::DeviceRegistry;
pub use scheduler::{CancelFlag, TriggerHandle, TriggerOutcome, TriggerScheduler};
pub use state::{ClientEvent, HostEvent};
pub use types::{ClientConfig, ClientState, Device, DeviceState, HostConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientEvent, ClientSession, ClientState, ClockOffset, DecodedAudio, Device,
        HostConfig, HostEvent, HostSession, Result, SyncError, WavDecoder,
    };
}
