//! Client side of a synchronized session
//!
//! ```text
//! Idle -> Connecting -> Downloading -> Syncing -> Ready -> Playing
//!          GET /info     GET /audio    GET /time   READY    PLAY_AT
//! ```
//!
//! Any failure before `Ready` parks the session in `Error` until
//! [`ClientSession::retry`].

mod session;
mod transport;
mod trigger;


pub use session::ClientSession;
pub use transport::{HostTransport, HttpTransport};
