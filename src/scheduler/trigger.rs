use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;

use crate::error::Result;

/// Recommended busy-poll window before the target instant.
pub const DEFAULT_PRECISION_MARGIN: Duration = Duration::from_millis(50);

/// Longest uninterrupted coarse sleep, bounding how long a cancelled
/// trigger thread lingers.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Scheduler configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Busy-poll window before the target instant.
    pub precision_margin: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            precision_margin: DEFAULT_PRECISION_MARGIN,
        }
    }
}

/// Shared cancellation flag for one trigger.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a trigger ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The action ran.
    Fired {
        /// Time between the target instant and the action starting
        /// (zero when the action started on time or early).
        lateness: Duration,
    },
    /// The flag was set before the action ran.
    Cancelled,
}

impl TriggerOutcome {
    /// Whether the action ran.
    #[must_use]
    pub fn fired(&self) -> bool {
        matches!(self, Self::Fired { .. })
    }
}

/// Block the calling thread until `target`, then run `action` once.
///
/// A target at or before now runs immediately. `cancel` is checked
/// throughout the wait and once more right before the action; a
/// cancelled trigger never runs its action.
pub fn wait_and_run<F>(
    target: SystemTime,
    precision_margin: Duration,
    cancel: &CancelFlag,
    action: F,
) -> TriggerOutcome
where
    F: FnOnce(),
{
    // Coarse phase
    loop {
        if cancel.is_cancelled() {
            return TriggerOutcome::Cancelled;
        }
        let Ok(remaining) = target.duration_since(SystemTime::now()) else {
            break;
        };
        if remaining <= precision_margin {
            break;
        }
        thread::sleep((remaining - precision_margin).min(MAX_SLEEP_SLICE));
    }

    // Fine phase
    loop {
        if cancel.is_cancelled() {
            return TriggerOutcome::Cancelled;
        }
        if SystemTime::now() >= target {
            break;
        }
        std::hint::spin_loop();
    }

    if cancel.is_cancelled() {
        return TriggerOutcome::Cancelled;
    }

    let lateness = SystemTime::now()
        .duration_since(target)
        .unwrap_or_default();
    action();
    TriggerOutcome::Fired { lateness }
}

/// Spawns triggers on dedicated threads.
#[derive(Debug, Clone, Default)]
pub struct TriggerScheduler {
    config: SchedulerConfig,
}

impl TriggerScheduler {
    /// Create a scheduler.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Configured busy-poll window.
    #[must_use]
    pub fn precision_margin(&self) -> Duration {
        self.config.precision_margin
    }

    /// Run `action` at `target` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns `Network` if the OS refuses to spawn the thread.
    pub fn schedule<F>(&self, target: SystemTime, action: F) -> Result<TriggerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancelFlag::new();
        let (done_tx, done_rx) = oneshot::channel();
        let margin = self.config.precision_margin;
        let flag = cancel.clone();

        let thread = thread::Builder::new()
            .name("synccast-trigger".into())
            .spawn(move || {
                let outcome = wait_and_run(target, margin, &flag, action);
                match outcome {
                    TriggerOutcome::Fired { lateness } => {
                        tracing::debug!(?lateness, "Trigger fired");
                    }
                    TriggerOutcome::Cancelled => tracing::debug!("Trigger cancelled"),
                }
                let _ = done_tx.send(outcome);
                outcome
            })?;

        Ok(TriggerHandle {
            target,
            cancel,
            thread: Some(thread),
            done: Some(done_rx),
        })
    }
}

/// Handle to a pending trigger.
///
/// Dropping the handle detaches the trigger; it still fires.
#[derive(Debug)]
pub struct TriggerHandle {
    target: SystemTime,
    cancel: CancelFlag,
    thread: Option<JoinHandle<TriggerOutcome>>,
    done: Option<oneshot::Receiver<TriggerOutcome>>,
}

impl TriggerHandle {
    /// Instant the trigger is set for.
    #[must_use]
    pub fn target(&self) -> SystemTime {
        self.target
    }

    /// Prevent the action from running if it has not started yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether `cancel()` was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the trigger thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Block until the trigger resolves.
    ///
    /// A panicking action is reported as `Cancelled`.
    pub fn join(mut self) -> TriggerOutcome {
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) => {
                tracing::warn!("Trigger action panicked");
                TriggerOutcome::Cancelled
            }
            None => TriggerOutcome::Cancelled,
        }
    }

    /// Wait for the trigger to resolve without blocking the runtime.
    pub async fn wait(&mut self) -> TriggerOutcome {
        match self.done.take() {
            Some(rx) => rx.await.unwrap_or(TriggerOutcome::Cancelled),
            None => TriggerOutcome::Cancelled,
        }
    }
}
