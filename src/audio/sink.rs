use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::error::Result;

/// Local audio output
///
/// Implementations wrap a platform device. Writes may block while the
/// device buffer is full.
pub trait AudioSink: Send {
    /// Frames the device can hold before playback starts
    fn buffer_capacity_frames(&self) -> usize;

    /// Queue `len` bytes of `data` starting at `offset`
    ///
    /// Returns the number of bytes accepted.
    ///
    /// # Errors
    ///
    /// Returns `Sink` if the device rejected the data.
    fn write(&mut self, data: &[u8], offset: usize, len: usize) -> Result<usize>;

    /// Start consuming queued data
    ///
    /// # Errors
    ///
    /// Returns `Sink` if the device cannot start.
    fn play(&mut self) -> Result<()>;

    /// Halt output
    ///
    /// # Errors
    ///
    /// Returns `Sink` if the device cannot stop.
    fn stop(&mut self) -> Result<()>;

    /// Discard queued data
    ///
    /// # Errors
    ///
    /// Returns `Sink` if the device cannot be flushed.
    fn flush(&mut self) -> Result<()>;
}

/// Creates a fresh sink for each playback
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn AudioSink> + Send + Sync>;

/// Factory producing [`NullSink`]s
#[must_use]
pub fn null_sink_factory() -> SinkFactory {
    Arc::new(|| Box::new(NullSink::default()) as Box<dyn AudioSink>)
}

/// Observations recorded by a [`NullSink`]
#[derive(Debug, Default)]
pub struct SinkStats {
    bytes_written: AtomicUsize,
    plays: AtomicUsize,
    stops: AtomicUsize,
    flushes: AtomicUsize,
    played_at: Mutex<Option<SystemTime>>,
}

impl SinkStats {
    /// Total bytes accepted
    pub fn bytes_written(&self) -> usize {
        self.bytes_written.load(Ordering::Acquire)
    }

    /// Number of `play()` calls
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::Acquire)
    }

    /// Number of `stop()` calls
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::Acquire)
    }

    /// Number of `flush()` calls
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::Acquire)
    }

    /// Wall-clock time of the first `play()`
    pub fn played_at(&self) -> Option<SystemTime> {
        self.played_at.lock().ok().and_then(|t| *t)
    }
}

/// Sink that discards audio
///
/// Used by headless hosts and tests; the attached [`SinkStats`] records
/// what the sink was asked to do.
#[derive(Debug, Clone)]
pub struct NullSink {
    capacity_frames: usize,
    stats: Arc<SinkStats>,
}

impl NullSink {
    /// Default prime size in frames
    pub const DEFAULT_CAPACITY_FRAMES: usize = 4096;

    /// Create a sink with a given buffer capacity
    #[must_use]
    pub fn new(capacity_frames: usize) -> Self {
        Self {
            capacity_frames,
            stats: Arc::new(SinkStats::default()),
        }
    }

    /// Shared observation handle
    #[must_use]
    pub fn stats(&self) -> Arc<SinkStats> {
        self.stats.clone()
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY_FRAMES)
    }
}

impl AudioSink for NullSink {
    fn buffer_capacity_frames(&self) -> usize {
        self.capacity_frames
    }

    fn write(&mut self, data: &[u8], offset: usize, len: usize) -> Result<usize> {
        let accepted = len.min(data.len().saturating_sub(offset));
        self.stats
            .bytes_written
            .fetch_add(accepted, Ordering::AcqRel);
        Ok(accepted)
    }

    fn play(&mut self) -> Result<()> {
        if self.stats.plays.fetch_add(1, Ordering::AcqRel) == 0 {
            if let Ok(mut at) = self.stats.played_at.lock() {
                *at = Some(SystemTime::now());
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stats.stops.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.stats.flushes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
