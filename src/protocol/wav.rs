//! 44-byte RIFF/WAVE header that prefixes the bulk payload
//!
//! ```text
//! 0   "RIFF"          4   chunk size (36 + data)   8  "WAVE"
//! 12  "fmt "          16  16 (fmt chunk size)      20 1 (PCM)
//! 22  channels        24  sample rate              28 byte rate
//! 32  block align     34  bits per sample
//! 36  "data"          40  data size
//! ```
//!
//! All integers little-endian.

use std::io::Cursor;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SyncError};

/// Size of the header in bytes
pub const WAV_HEADER_LEN: usize = 44;

/// Largest data section whose RIFF chunk size still fits in 32 bits
pub const MAX_DATA_SIZE: u32 = u32::MAX - 36;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Fields carried by the payload header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Frames per second
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample (per channel)
    pub bits_per_sample: u16,
    /// Length of the PCM data following the header
    pub data_size: u32,
}

impl WavHeader {
    /// Create a header for `data_size` bytes of PCM
    #[must_use]
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16, data_size: u32) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            data_size,
        }
    }

    /// Create a header for a PCM buffer of `data_len` bytes
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if `data_len` exceeds [`MAX_DATA_SIZE`].
    pub fn for_data_len(
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        data_len: usize,
    ) -> Result<Self> {
        let data_size = u32::try_from(data_len)
            .ok()
            .filter(|size| *size <= MAX_DATA_SIZE)
            .ok_or_else(|| {
                SyncError::decode(format!(
                    "{data_len} bytes of PCM exceed the {MAX_DATA_SIZE} byte WAV limit"
                ))
            })?;
        Ok(Self::new(sample_rate, channels, bits_per_sample, data_size))
    }

    /// Bytes per frame (all channels)
    #[must_use]
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second
    #[must_use]
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate
            .saturating_mul(u32::from(self.block_align()))
    }

    /// Playback length of the data section
    #[must_use]
    pub fn duration(&self) -> Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.data_size) / f64::from(byte_rate))
    }

    /// Encode to the 44-byte wire form
    #[must_use]
    pub fn encode(&self) -> [u8; WAV_HEADER_LEN] {
        let mut out = [0u8; WAV_HEADER_LEN];
        let mut cursor = Cursor::new(&mut out[..]);

        // Writes into a fixed 44-byte buffer cannot run out of space.
        let _ = self.write_into(&mut cursor);
        out
    }

    fn write_into(&self, w: &mut Cursor<&mut [u8]>) -> std::io::Result<()> {
        use std::io::Write;

        w.write_all(b"RIFF")?;
        w.write_u32::<LittleEndian>(36u32.saturating_add(self.data_size))?;
        w.write_all(b"WAVE")?;
        w.write_all(b"fmt ")?;
        w.write_u32::<LittleEndian>(FMT_CHUNK_LEN)?;
        w.write_u16::<LittleEndian>(PCM_FORMAT_TAG)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.sample_rate)?;
        w.write_u32::<LittleEndian>(self.byte_rate())?;
        w.write_u16::<LittleEndian>(self.block_align())?;
        w.write_u16::<LittleEndian>(self.bits_per_sample)?;
        w.write_all(b"data")?;
        w.write_u32::<LittleEndian>(self.data_size)?;
        Ok(())
    }

    /// Decode the header from the start of `data`
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if fewer than 44 bytes are available, a
    /// marker is wrong, or the format is not integer PCM.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < WAV_HEADER_LEN {
            return Err(SyncError::decode(format!(
                "payload header needs {WAV_HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }

        expect_marker(data, 0, b"RIFF")?;
        expect_marker(data, 8, b"WAVE")?;
        expect_marker(data, 12, b"fmt ")?;
        expect_marker(data, 36, b"data")?;

        let mut r = Cursor::new(&data[20..36]);
        let read_err = |e: std::io::Error| SyncError::decode(e.to_string());

        let format_tag = r.read_u16::<LittleEndian>().map_err(read_err)?;
        if format_tag != PCM_FORMAT_TAG {
            return Err(SyncError::decode(format!(
                "unsupported format tag {format_tag}"
            )));
        }
        let channels = r.read_u16::<LittleEndian>().map_err(read_err)?;
        let sample_rate = r.read_u32::<LittleEndian>().map_err(read_err)?;
        let _byte_rate = r.read_u32::<LittleEndian>().map_err(read_err)?;
        let _block_align = r.read_u16::<LittleEndian>().map_err(read_err)?;
        let bits_per_sample = r.read_u16::<LittleEndian>().map_err(read_err)?;

        let mut r = Cursor::new(&data[40..44]);
        let data_size = r.read_u32::<LittleEndian>().map_err(read_err)?;

        if channels == 0 || sample_rate == 0 || bits_per_sample == 0 {
            return Err(SyncError::decode("zero channels, rate or sample width"));
        }

        Ok(Self {
            sample_rate,
            channels,
            bits_per_sample,
            data_size,
        })
    }
}

fn expect_marker(data: &[u8], at: usize, marker: &[u8; 4]) -> Result<()> {
    if &data[at..at + 4] == marker {
        Ok(())
    } else {
        Err(SyncError::decode(format!(
            "expected {:?} marker at offset {at}",
            String::from_utf8_lossy(marker)
        )))
    }
}
