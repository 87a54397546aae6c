use std::io::{self, Cursor};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::decoder::{DecodedAudio, PayloadDecoder};
use crate::error::{Result, SyncError};

/// Decoder for compressed payloads (MP3, AAC, ALAC, PCM containers)
///
/// Output is always 16-bit interleaved PCM.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    extension: Option<String>,
}

impl SymphoniaDecoder {
    /// Create a decoder that detects the format from content
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint the container format by file extension
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

impl PayloadDecoder for SymphoniaDecoder {
    fn decode(&self, payload: &[u8]) -> Result<DecodedAudio> {
        let src = Cursor::new(payload.to_vec());
        let mss = MediaSourceStream::new(Box::new(src), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }

        let detected = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SyncError::decode(format!("unrecognised container: {e}")))?;

        let mut format = detected.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SyncError::decode("no supported audio tracks"))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track
            .codec_params
            .channels
            .and_then(|c| u16::try_from(c.count()).ok());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| SyncError::decode(format!("unsupported codec: {e}")))?;

        let mut pcm = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(SyncError::decode("stream reset required"));
                }
                Err(e) => return Err(SyncError::decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(u16::try_from(spec.channels.count()).unwrap_or(2));

                    let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    for sample in buf.samples() {
                        pcm.extend_from_slice(&sample.to_le_bytes());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => return Err(SyncError::decode(e.to_string())),
            }
        }

        let (Some(sample_rate), Some(channels)) = (sample_rate, channels) else {
            return Err(SyncError::decode("stream carries no audio frames"));
        };

        Ok(DecodedAudio::new(pcm, sample_rate, channels, 16))
    }
}
