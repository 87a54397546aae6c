//! Event buses for host and client notifications

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::clock::ClockOffset;
use crate::types::{ClientState, Device};

/// Host session events
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Listeners are up
    Started {
        /// Bound bulk-transfer address
        http_addr: SocketAddr,
        /// Bound control datagram address
        control_addr: SocketAddr,
    },
    /// Session stopped and registry cleared
    Stopped,
    /// First contact from a new device
    DeviceConnected {
        /// The newly created record
        device: Device,
    },
    /// Device confirmed it holds the payload
    DeviceReady {
        /// The updated record
        device: Device,
    },
    /// `PLAY_AT` went out
    PlaybackScheduled {
        /// Host-clock trigger instant (epoch ms)
        instant_ms: i64,
        /// Number of datagrams that were sent successfully
        recipients: usize,
    },
    /// Local playback began at the trigger
    PlaybackStarted {
        /// How late the local action fired
        lateness: Duration,
    },
}

/// Client session events
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Session state changed
    StateChanged {
        /// Previous state
        old: ClientState,
        /// New state
        new: ClientState,
    },
    /// Clock sync finished
    OffsetComputed {
        /// Estimated offset (local - host)
        offset: ClockOffset,
        /// Samples that contributed
        samples: usize,
    },
    /// `PLAY_AT` received and handed to the scheduler
    TriggerScheduled {
        /// Instant on the host clock
        host_instant_ms: i64,
        /// Same instant translated to the local clock
        local_instant_ms: i64,
    },
    /// Playback began at the trigger
    PlaybackStarted {
        /// How late the local action fired
        lateness: Duration,
    },
}

/// Event bus for distributing events
pub struct EventBus<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    /// Create a new event bus
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: T) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    /// Get subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Event filter for selective subscription
pub struct EventFilter<T> {
    rx: broadcast::Receiver<T>,
    filter: Box<dyn Fn(&T) -> bool + Send>,
}

impl<T: Clone> EventFilter<T> {
    /// Create a filtered event receiver
    pub fn new<F>(bus: &EventBus<T>, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        Self {
            rx: bus.subscribe(),
            filter: Box::new(filter),
        }
    }

    /// Receive next matching event
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) if (self.filter)(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl EventFilter<HostEvent> {
    /// Filter for registry events only
    #[must_use]
    pub fn device_events(bus: &EventBus<HostEvent>) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                HostEvent::DeviceConnected { .. } | HostEvent::DeviceReady { .. }
            )
        })
    }
}

impl EventFilter<ClientEvent> {
    /// Filter for state changes only
    #[must_use]
    pub fn state_changes(bus: &EventBus<ClientEvent>) -> Self {
        Self::new(bus, |e| matches!(e, ClientEvent::StateChanged { .. }))
    }
}
