use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tokio::task::JoinHandle;

use super::payload::LoadedPayload;
use super::server::HttpContext;
use super::{control, server};
use crate::audio::{
    DecodedAudio, PlaybackJob, ScheduledPlayback, SinkFactory, null_sink_factory,
};
use crate::clock::{now_millis, system_time_from_millis};
use crate::error::{Result, SyncError};
use crate::protocol::{ControlMessage, PayloadInfo};
use crate::registry::DeviceRegistry;
use crate::scheduler::{SchedulerConfig, TriggerScheduler};
use crate::state::{EventBus, HostEvent};
use crate::types::{Device, HostConfig, TriggerCommand};

/// Time allowed for open connections to drain on stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Listener tasks of a running session
struct Listeners {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    http_addr: SocketAddr,
    control_addr: SocketAddr,
}

/// A hosting session
///
/// # Example
///
/// ```rust,no_run
/// use synccast::audio::DecodedAudio;
/// use synccast::host::HostSession;
/// use synccast::types::HostConfig;
///
/// # async fn example() -> synccast::Result<()> {
/// let host = HostSession::new(HostConfig::default());
/// host.load_payload(DecodedAudio::new(vec![0; 176_400], 44_100, 2, 16)).await?;
/// host.start().await?;
///
/// // ... wait for devices to report ready ...
/// if host.all_ready().await {
///     let trigger = host.start_playback().await?;
///     println!("playing at {}", trigger.instant_ms);
/// }
/// # Ok(())
/// # }
/// ```
pub struct HostSession {
    config: HostConfig,
    events: EventBus<HostEvent>,
    registry: Arc<DeviceRegistry>,
    payload: Arc<RwLock<Option<Arc<LoadedPayload>>>>,
    scheduler: TriggerScheduler,
    sink_factory: SinkFactory,
    listeners: Mutex<Option<Listeners>>,
    pending: Mutex<Option<ScheduledPlayback>>,
}

impl HostSession {
    /// Create a stopped session
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        let events = EventBus::new();
        let scheduler = TriggerScheduler::new(SchedulerConfig {
            precision_margin: config.precision_margin,
        });

        Self {
            config,
            registry: Arc::new(DeviceRegistry::new(events.clone())),
            events,
            payload: Arc::new(RwLock::new(None)),
            scheduler,
            sink_factory: null_sink_factory(),
            listeners: Mutex::new(None),
            pending: Mutex::new(None),
        }
    }

    /// Use `factory` to open the local output for each playback
    #[must_use]
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = factory;
        self
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Event bus for filtered subscriptions
    #[must_use]
    pub fn events(&self) -> &EventBus<HostEvent> {
        &self.events
    }

    /// Device registry
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Replace the payload served to clients
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the PCM does not fit a WAV container;
    /// the previous payload stays loaded.
    pub async fn load_payload(&self, audio: DecodedAudio) -> Result<()> {
        let payload = LoadedPayload::new(audio)?;
        tracing::info!(info = %payload.info(), bytes = payload.wav().len(), "Payload loaded");
        *self.payload.write().await = Some(Arc::new(payload));
        Ok(())
    }

    /// Metadata of the loaded payload
    pub async fn payload_info(&self) -> Option<PayloadInfo> {
        self.payload.read().await.as_ref().map(|p| p.info())
    }

    /// Known devices in contact order
    pub async fn devices(&self) -> Vec<Device> {
        self.registry.snapshot().await
    }

    /// True when at least one device is known and all are ready
    pub async fn all_ready(&self) -> bool {
        self.registry.all_ready().await
    }

    /// Whether the listeners are up
    pub async fn is_running(&self) -> bool {
        self.listeners.lock().await.is_some()
    }

    /// Bound bulk-transfer address while running
    pub async fn http_addr(&self) -> Option<SocketAddr> {
        self.listeners.lock().await.as_ref().map(|l| l.http_addr)
    }

    /// Bound control address while running
    pub async fn control_addr(&self) -> Option<SocketAddr> {
        self.listeners.lock().await.as_ref().map(|l| l.control_addr)
    }

    /// Bind the listeners and begin accepting clients
    ///
    /// A running session is stopped first.
    ///
    /// # Errors
    ///
    /// Returns `Network` if either port cannot be bound.
    pub async fn start(&self) -> Result<()> {
        if self.is_running().await {
            self.stop().await;
        }

        let listener = TcpListener::bind((self.config.bind_addr, self.config.http_port)).await?;
        let socket = UdpSocket::bind((self.config.bind_addr, self.config.control_port)).await?;
        let http_addr = listener.local_addr()?;
        let control_addr = socket.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = Arc::new(HttpContext {
            registry: self.registry.clone(),
            payload: self.payload.clone(),
            shutdown: shutdown_rx.clone(),
        });

        let tasks = vec![
            tokio::spawn(server::serve(listener, ctx, shutdown_rx.clone())),
            tokio::spawn(control::listen(socket, self.registry.clone(), shutdown_rx)),
        ];

        *self.listeners.lock().await = Some(Listeners {
            shutdown_tx,
            tasks,
            http_addr,
            control_addr,
        });

        tracing::info!(%http_addr, %control_addr, "Host session started");
        self.events.emit(HostEvent::Started {
            http_addr,
            control_addr,
        });
        Ok(())
    }

    /// Cancel any pending trigger, close the listeners and forget every
    /// device
    ///
    /// Open HTTP connections are drained before the registry is cleared, and
    /// requests arriving meanwhile are refused. Safe to call repeatedly.
    pub async fn stop(&self) {
        if let Some(pending) = self.pending.lock().await.take() {
            pending.cancel();
        }

        let listeners = self.listeners.lock().await.take();
        let was_running = listeners.is_some();
        if let Some(listeners) = listeners {
            let _ = listeners.shutdown_tx.send(true);
            for mut task in listeners.tasks {
                if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                    tracing::warn!("Listener did not drain in time, aborting");
                    task.abort();
                }
            }
        }

        // Every handler has finished or seen the shutdown flag by now
        self.registry.clear().await;

        if was_running {
            tracing::info!("Host session stopped");
            self.events.emit(HostEvent::Stopped);
        }
    }

    /// Announce a start instant `trigger_delay` from now and schedule
    /// local playback for it
    ///
    /// `PLAY_AT` goes to every known device and to the broadcast address.
    /// A failed send is logged and skipped. Any earlier local trigger is
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if no payload is loaded, or
    /// `TransportUnreachable` if every send failed.
    pub async fn start_playback(&self) -> Result<TriggerCommand> {
        let Some(payload) = self.payload.read().await.clone() else {
            return Err(SyncError::InvalidState {
                message: "no payload loaded".into(),
                current_state: "idle".into(),
            });
        };

        let delay_ms = i64::try_from(self.config.trigger_delay.as_millis()).unwrap_or(i64::MAX);
        let command = TriggerCommand::at(now_millis().saturating_add(delay_ms));

        let recipients = self.send_trigger(command).await?;

        self.schedule_local(command, &payload).await?;

        tracing::info!(instant_ms = command.instant_ms, recipients, "Playback scheduled");
        self.events.emit(HostEvent::PlaybackScheduled {
            instant_ms: command.instant_ms,
            recipients,
        });
        Ok(command)
    }

    async fn send_trigger(&self, command: TriggerCommand) -> Result<usize> {
        let port = self.config.trigger_port;
        let mut targets: Vec<SocketAddr> = self
            .registry
            .addresses()
            .await
            .into_iter()
            .map(|ip| SocketAddr::new(ip, port))
            .collect();
        if let Some(broadcast) = self.config.broadcast_addr {
            targets.push(SocketAddr::new(broadcast, port));
        }

        if targets.is_empty() {
            tracing::warn!("No devices to notify");
            return Ok(0);
        }

        let unspecified: IpAddr = match self.config.bind_addr {
            IpAddr::V4(_) => std::net::Ipv4Addr::UNSPECIFIED.into(),
            IpAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind((unspecified, 0)).await?;
        if self.config.broadcast_addr.is_some() {
            if let Err(e) = socket.set_broadcast(true) {
                tracing::warn!("Cannot enable broadcast: {}", e);
            }
        }

        let frame = ControlMessage::play_at(command.instant_ms).encode();
        let mut sent = 0;
        let mut last_error = None;

        for target in &targets {
            match socket.send_to(&frame, target).await {
                Ok(_) => {
                    tracing::debug!(%target, "PLAY_AT sent");
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(%target, "PLAY_AT send failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match (sent, last_error) {
            (0, Some(e)) => Err(SyncError::transport("every PLAY_AT send failed", e)),
            _ => Ok(sent),
        }
    }

    async fn schedule_local(&self, command: TriggerCommand, payload: &LoadedPayload) -> Result<()> {
        let target = system_time_from_millis(command.instant_ms).ok_or_else(|| {
            SyncError::InvalidState {
                message: format!("trigger instant {} out of range", command.instant_ms),
                current_state: "running".into(),
            }
        })?;

        let mut pending = self.pending.lock().await;
        if let Some(previous) = pending.take() {
            tracing::debug!("Replacing pending local trigger");
            previous.cancel();
        }

        let events = self.events.clone();

        let job = if self.config.local_playback {
            let mut job = PlaybackJob::new((self.sink_factory)(), payload.audio().clone());
            if let Err(e) = job.prime() {
                tracing::warn!("Priming local sink failed: {}", e);
            }
            Some(job)
        } else {
            None
        };

        let playback = ScheduledPlayback::schedule(&self.scheduler, target, job, move |lateness| {
            events.emit(HostEvent::PlaybackStarted { lateness });
        })?;

        *pending = Some(playback);
        Ok(())
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.cancel();
        }
        if let Some(listeners) = self.listeners.get_mut().take() {
            let _ = listeners.shutdown_tx.send(true);
        }
    }
}
