//! Wire formats
//!
//! - [`control`]: `READY` / `PLAY_AT` datagrams
//! - [`wav`]: the 44-byte header in front of the PCM payload
//! - [`info`]: the `/info` metadata body

#![allow(missing_docs)]

pub mod control;
pub mod info;
pub mod wav;

#[cfg(test)]
mod tests;

pub use control::ControlMessage;
pub use info::PayloadInfo;
pub use wav::{MAX_DATA_SIZE, WAV_HEADER_LEN, WavHeader};
