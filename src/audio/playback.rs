use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::decoder::DecodedAudio;
use super::sink::AudioSink;
use crate::error::{Result, SyncError};
use crate::scheduler::{CancelFlag, TriggerHandle, TriggerScheduler};

/// One playback of a decoded payload through a sink
///
/// `prime()` fills the device buffer ahead of the trigger so that
/// `run()` only has to call `play()` when the instant arrives.
pub struct PlaybackJob {
    sink: Box<dyn AudioSink>,
    audio: Arc<DecodedAudio>,
    position: usize,
    halt: CancelFlag,
}

impl PlaybackJob {
    /// Create a job for `audio` on `sink`
    #[must_use]
    pub fn new(sink: Box<dyn AudioSink>, audio: Arc<DecodedAudio>) -> Self {
        Self {
            sink,
            audio,
            position: 0,
            halt: CancelFlag::new(),
        }
    }

    /// Flag that stops a running job between writes
    #[must_use]
    pub fn halt_flag(&self) -> CancelFlag {
        self.halt.clone()
    }

    /// Bytes handed to the sink so far
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Write up to one device buffer of audio without starting playback
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn prime(&mut self) -> Result<usize> {
        let chunk = self.chunk_bytes();
        let len = chunk.min(self.audio.pcm.len() - self.position);
        let written = self.sink.write(&self.audio.pcm, self.position, len)?;
        self.position += written;
        tracing::debug!(bytes = written, "Sink primed");
        Ok(written)
    }

    /// Start playback and feed the rest of the payload
    ///
    /// Returns early, stopping and flushing the sink, once the halt flag
    /// is set.
    ///
    /// # Errors
    ///
    /// Propagates sink failures, or `Sink` if the device stops accepting
    /// data.
    pub fn run(mut self) -> Result<()> {
        self.sink.play()?;

        let chunk = self.chunk_bytes();
        while self.position < self.audio.pcm.len() {
            if self.halt.is_cancelled() {
                tracing::debug!(position = self.position, "Playback halted");
                return self.shutdown();
            }
            let len = chunk.min(self.audio.pcm.len() - self.position);
            let written = self.sink.write(&self.audio.pcm, self.position, len)?;
            if written == 0 {
                return Err(SyncError::Sink {
                    message: "sink accepted no data".into(),
                });
            }
            self.position += written;
        }

        tracing::debug!(bytes = self.position, "Payload fully queued");
        Ok(())
    }

    /// Stop and flush the sink
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn shutdown(&mut self) -> Result<()> {
        self.sink.stop()?;
        self.sink.flush()
    }

    fn chunk_bytes(&self) -> usize {
        let frames = self.sink.buffer_capacity_frames().max(1);
        frames.saturating_mul(self.audio.frame_size().max(1))
    }
}

/// A playback waiting for, or running after, its trigger
pub struct ScheduledPlayback {
    trigger: TriggerHandle,
    halt: CancelFlag,
}

impl ScheduledPlayback {
    /// Run `on_start` and then `job` at `target`
    ///
    /// `on_start` receives how late the trigger fired. A primed `job`
    /// only has to start the sink at that point.
    ///
    /// # Errors
    ///
    /// Returns `Network` if the trigger thread cannot be spawned.
    pub fn schedule<F>(
        scheduler: &TriggerScheduler,
        target: SystemTime,
        job: Option<PlaybackJob>,
        on_start: F,
    ) -> Result<Self>
    where
        F: FnOnce(Duration) + Send + 'static,
    {
        let halt = job.as_ref().map_or_else(CancelFlag::new, PlaybackJob::halt_flag);

        let trigger = scheduler.schedule(target, move || {
            let lateness = SystemTime::now()
                .duration_since(target)
                .unwrap_or_default();
            on_start(lateness);
            if let Some(job) = job {
                if let Err(e) = job.run() {
                    tracing::error!("Playback failed: {}", e);
                }
            }
        })?;

        Ok(Self { trigger, halt })
    }

    /// Local instant the playback starts at
    #[must_use]
    pub fn target(&self) -> SystemTime {
        self.trigger.target()
    }

    /// Prevent a pending start, or halt a running playback
    pub fn cancel(&self) {
        self.trigger.cancel();
        self.halt.cancel();
    }

    /// Whether the trigger thread has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.trigger.is_finished()
    }
}
