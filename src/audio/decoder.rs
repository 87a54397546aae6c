use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::protocol::{PayloadInfo, WAV_HEADER_LEN, WavHeader};

/// Raw interleaved little-endian PCM and its format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    /// Interleaved sample bytes
    pub pcm: Vec<u8>,
    /// Frames per second
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

impl DecodedAudio {
    /// Wrap PCM bytes
    #[must_use]
    pub fn new(pcm: Vec<u8>, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            pcm,
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Bytes per interleaved frame
    #[must_use]
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * usize::from(self.bits_per_sample / 8)
    }

    /// Number of whole frames
    #[must_use]
    pub fn frames(&self) -> usize {
        match self.frame_size() {
            0 => 0,
            size => self.pcm.len() / size,
        }
    }

    /// Playback length
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Metadata served on `/info`
    #[must_use]
    pub fn info(&self) -> PayloadInfo {
        PayloadInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            duration_ms: u64::try_from(self.duration().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Header describing this PCM
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the PCM is too large for a WAV header.
    pub fn wav_header(&self) -> Result<WavHeader> {
        WavHeader::for_data_len(
            self.sample_rate,
            self.channels,
            self.bits_per_sample,
            self.pcm.len(),
        )
    }

    /// Header followed by the PCM bytes
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the PCM is too large for a WAV header.
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        let header = self.wav_header()?;
        let mut out = Vec::with_capacity(WAV_HEADER_LEN + self.pcm.len());
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&self.pcm);
        Ok(out)
    }
}

/// Turns a downloaded payload into raw samples
pub trait PayloadDecoder: Send + Sync {
    /// Decode `payload`
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the payload is not in a supported format.
    fn decode(&self, payload: &[u8]) -> Result<DecodedAudio>;
}

/// Decoder for the 44-byte header container the host serves
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl PayloadDecoder for WavDecoder {
    fn decode(&self, payload: &[u8]) -> Result<DecodedAudio> {
        let header = WavHeader::decode(payload)?;
        if header.bits_per_sample % 8 != 0 {
            return Err(SyncError::decode(format!(
                "unsupported sample width {}",
                header.bits_per_sample
            )));
        }

        let body = &payload[WAV_HEADER_LEN..];
        let declared = usize::try_from(header.data_size).unwrap_or(usize::MAX);
        if body.len() < declared {
            tracing::warn!(
                declared,
                available = body.len(),
                "Payload shorter than its header declares"
            );
        }
        let len = declared.min(body.len());

        Ok(DecodedAudio::new(
            body[..len].to_vec(),
            header.sample_rate,
            header.channels,
            header.bits_per_sample,
        ))
    }
}
