//! Client session state with change notifications

use tokio::sync::{RwLock, watch};

use crate::clock::ClockOffset;
use crate::error::{Result, SyncError};
use crate::protocol::PayloadInfo;
use crate::types::ClientState;

/// Everything observable about one client session
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Lifecycle state
    pub state: ClientState,
    /// Offset from the last completed sync
    pub offset: Option<ClockOffset>,
    /// Metadata of the downloaded payload
    pub payload: Option<PayloadInfo>,
}

/// State container with change notifications
pub struct StateContainer {
    state: RwLock<SessionSnapshot>,
    tx: watch::Sender<SessionSnapshot>,
    rx: watch::Receiver<SessionSnapshot>,
}

impl StateContainer {
    /// Create a new state container
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(SessionSnapshot::default());
        Self {
            state: RwLock::new(SessionSnapshot::default()),
            tx,
            rx,
        }
    }

    /// Get current snapshot
    pub async fn get(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    /// Get current lifecycle state
    pub async fn state(&self) -> ClientState {
        self.state.read().await.state.clone()
    }

    /// Subscribe to changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.rx.clone()
    }

    /// Update with a function
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionSnapshot),
    {
        let mut state = self.state.write().await;
        f(&mut state);
        let _ = self.tx.send(state.clone());
    }

    /// Move to `next`, returning the previous state
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if the state machine forbids the move.
    pub async fn transition(&self, next: ClientState) -> Result<ClientState> {
        let mut state = self.state.write().await;
        if !state.state.can_transition_to(&next) {
            return Err(SyncError::InvalidState {
                message: format!("cannot move to {}", next.name()),
                current_state: state.state.to_string(),
            });
        }
        let old = std::mem::replace(&mut state.state, next);
        let _ = self.tx.send(state.clone());
        Ok(old)
    }

    /// Record the sync result
    pub async fn set_offset(&self, offset: ClockOffset) {
        self.update(|s| s.offset = Some(offset)).await;
    }

    /// Record payload metadata
    pub async fn set_payload(&self, payload: PayloadInfo) {
        self.update(|s| s.payload = Some(payload)).await;
    }

    /// Drop everything and return to `Idle`
    pub async fn reset(&self) -> ClientState {
        let mut state = self.state.write().await;
        let old = std::mem::take(&mut *state).state;
        let _ = self.tx.send(state.clone());
        old
    }
}

impl Default for StateContainer {
    fn default() -> Self {
        Self::new()
    }
}
