//! Audio payload handling
//!
//! - [`DecodedAudio`]: raw interleaved PCM plus its format
//! - [`PayloadDecoder`]: turns a downloaded payload into `DecodedAudio`
//! - [`AudioSink`]: the local output device
//! - [`PlaybackJob`]: primes a sink ahead of the trigger and feeds it after

mod decoder;
mod playback;
mod sink;
#[cfg(feature = "decoders")]
mod compressed;

#[cfg(test)]
mod tests;

pub use decoder::{DecodedAudio, PayloadDecoder, WavDecoder};
pub use playback::{PlaybackJob, ScheduledPlayback};
pub use sink::{AudioSink, NullSink, SinkFactory, SinkStats, null_sink_factory};
#[cfg(feature = "decoders")]
pub use compressed::SymphoniaDecoder;
