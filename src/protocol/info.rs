//! `GET /info` body: `sampleRate=<int>&channels=<int>&duration=<int>`

use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Metadata of the payload a host is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadInfo {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Playback length in milliseconds
    pub duration_ms: u64,
}

impl fmt::Display for PayloadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sampleRate={}&channels={}&duration={}",
            self.sample_rate, self.channels, self.duration_ms
        )
    }
}

impl FromStr for PayloadInfo {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sample_rate = None;
        let mut channels = None;
        let mut duration_ms = None;

        for pair in s.trim().split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(SyncError::decode(format!("malformed info pair: {pair}")));
            };
            let bad = |_| SyncError::decode(format!("invalid value for {key}: {value}"));
            match key {
                "sampleRate" => sample_rate = Some(value.parse().map_err(bad)?),
                "channels" => channels = Some(value.parse().map_err(bad)?),
                "duration" => duration_ms = Some(value.parse().map_err(bad)?),
                _ => {}
            }
        }

        Ok(Self {
            sample_rate: sample_rate.ok_or_else(|| SyncError::decode("missing sampleRate"))?,
            channels: channels.ok_or_else(|| SyncError::decode("missing channels"))?,
            duration_ms: duration_ms.ok_or_else(|| SyncError::decode("missing duration"))?,
        })
    }
}
