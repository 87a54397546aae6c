use std::sync::Arc;

use bytes::Bytes;

use crate::audio::DecodedAudio;
use crate::error::Result;
use crate::protocol::PayloadInfo;

/// The payload a host is serving
///
/// The wire form is built once and shared by every transfer.
#[derive(Debug, Clone)]
pub struct LoadedPayload {
    audio: Arc<DecodedAudio>,
    wav: Bytes,
    info: PayloadInfo,
}

impl LoadedPayload {
    /// Prepare `audio` for serving
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the PCM does not fit a WAV container.
    pub fn new(audio: DecodedAudio) -> Result<Self> {
        let wav = Bytes::from(audio.to_wav()?);
        let info = audio.info();
        Ok(Self {
            audio: Arc::new(audio),
            wav,
            info,
        })
    }

    /// Decoded samples for local playback
    #[must_use]
    pub fn audio(&self) -> &Arc<DecodedAudio> {
        &self.audio
    }

    /// Header plus PCM, as served on `/audio`
    #[must_use]
    pub fn wav(&self) -> &Bytes {
        &self.wav
    }

    /// Metadata served on `/info`
    #[must_use]
    pub fn info(&self) -> PayloadInfo {
        self.info
    }
}
