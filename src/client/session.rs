use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use super::transport::{HostTransport, HttpTransport};
use super::trigger::{self, PendingTrigger, TriggerContext};
use crate::audio::{
    DecodedAudio, PayloadDecoder, SinkFactory, WavDecoder, null_sink_factory,
};
use crate::clock::{ClockOffset, ClockSample, ClockSync, now_millis};
use crate::error::{Result, SyncError};
use crate::protocol::{ControlMessage, PayloadInfo};
use crate::scheduler::{SchedulerConfig, TriggerScheduler};
use crate::state::{ClientEvent, EventBus, SessionSnapshot, StateContainer};
use crate::types::{ClientConfig, ClientState};

/// Trigger listener of a synced session
struct Listener {
    host: IpAddr,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Move the state machine and announce the change
pub(crate) async fn advance(
    state: &StateContainer,
    events: &EventBus<ClientEvent>,
    next: ClientState,
) -> Result<()> {
    let old = state.transition(next.clone()).await?;
    tracing::info!(from = %old, to = %next, "Client state changed");
    events.emit(ClientEvent::StateChanged { old, new: next });
    Ok(())
}

/// A client session against one host
///
/// # Example
///
/// ```rust,no_run
/// use std::net::{IpAddr, Ipv4Addr};
/// use synccast::client::ClientSession;
/// use synccast::types::ClientConfig;
///
/// # async fn example() -> synccast::Result<()> {
/// let client = ClientSession::new(ClientConfig::with_name("Kitchen"));
/// let offset = client
///     .connect(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)))
///     .await?;
/// println!("synced, offset {offset}");
/// # Ok(())
/// # }
/// ```
pub struct ClientSession {
    config: ClientConfig,
    transport: Arc<dyn HostTransport>,
    decoder: Arc<dyn PayloadDecoder>,
    sink_factory: SinkFactory,
    scheduler: TriggerScheduler,
    state: Arc<StateContainer>,
    events: EventBus<ClientEvent>,
    listener: Mutex<Option<Listener>>,
    pending: PendingTrigger,
}

impl ClientSession {
    /// Create an idle session
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::from_config(&config));
        let scheduler = TriggerScheduler::new(SchedulerConfig {
            precision_margin: config.precision_margin,
        });

        Self {
            config,
            transport,
            decoder: Arc::new(WavDecoder),
            sink_factory: null_sink_factory(),
            scheduler,
            state: Arc::new(StateContainer::new()),
            events: EventBus::new(),
            listener: Mutex::new(None),
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Use a custom bulk-transfer implementation
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HostTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Use a custom payload decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn PayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Use `factory` to open the output for each playback
    #[must_use]
    pub fn with_sink_factory(mut self, factory: SinkFactory) -> Self {
        self.sink_factory = factory;
        self
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current lifecycle state
    pub async fn state(&self) -> ClientState {
        self.state.state().await
    }

    /// Offset from the last completed sync
    pub async fn offset(&self) -> Option<ClockOffset> {
        self.state.get().await.offset
    }

    /// Metadata of the downloaded payload
    pub async fn payload_info(&self) -> Option<PayloadInfo> {
        self.state.get().await.payload
    }

    /// Watch state, offset and payload metadata
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Subscribe to session events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Event bus for filtered subscriptions
    #[must_use]
    pub fn events(&self) -> &EventBus<ClientEvent> {
        &self.events
    }

    /// Host of the synced session
    pub async fn host(&self) -> Option<IpAddr> {
        self.listener.lock().await.as_ref().map(|l| l.host)
    }

    /// Bound address of the trigger listener
    pub async fn trigger_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(|l| l.local_addr)
    }

    /// Download the payload from `host`, sync clocks and report ready
    ///
    /// Returns the estimated offset once the session reaches `Ready`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the session is `Idle`. Any other
    /// failure also moves the session to `Error`.
    pub async fn connect(&self, host: IpAddr) -> Result<ClockOffset> {
        advance(&self.state, &self.events, ClientState::Connecting).await?;
        tracing::info!(%host, "Connecting");

        match self.establish(host).await {
            Ok(offset) => Ok(offset),
            Err(e) => {
                tracing::warn!(%host, "Session failed: {}", e);
                if let Err(state_err) =
                    advance(&self.state, &self.events, ClientState::Error(e.to_string())).await
                {
                    tracing::debug!("Session changed underneath failure: {}", state_err);
                }
                Err(e)
            }
        }
    }

    async fn establish(&self, host: IpAddr) -> Result<ClockOffset> {
        let advertised = self.transport.fetch_info(host).await?;

        advance(&self.state, &self.events, ClientState::Downloading).await?;
        let payload = self.transport.fetch_payload(host).await?;
        let audio = self.decoder.decode(&payload)?;
        let info = audio.info();
        if info != advertised {
            tracing::warn!(%advertised, decoded = %info, "Payload differs from advertised metadata");
        }
        tracing::info!(%info, bytes = payload.len(), "Payload downloaded");
        self.state.set_payload(info).await;

        advance(&self.state, &self.events, ClientState::Syncing).await?;
        let (offset, samples) = self.sync_clock(host).await?;
        self.state.set_offset(offset).await;
        self.events.emit(ClientEvent::OffsetComputed { offset, samples });

        let socket = UdpSocket::bind((self.config.bind_addr, self.config.trigger_port)).await?;
        let local_addr = socket.local_addr()?;
        let ready = ControlMessage::ready(self.config.display_name.as_str()).encode();
        socket
            .send_to(&ready, SocketAddr::new(host, self.config.control_port))
            .await
            .map_err(|e| SyncError::transport("READY send failed", e))?;
        tracing::debug!(%host, name = %self.config.display_name, "READY sent");

        advance(&self.state, &self.events, ClientState::Ready).await?;
        self.spawn_listener(host, socket, local_addr, offset, Arc::new(audio))
            .await;

        Ok(offset)
    }

    async fn sync_clock(&self, host: IpAddr) -> Result<(ClockOffset, usize)> {
        let mut sync = ClockSync::new();

        for i in 0..self.config.sample_count {
            if i > 0 {
                tokio::time::sleep(self.config.sample_interval).await;
            }

            let local_send = now_millis();
            match self.transport.fetch_time(host).await {
                Ok(remote) => {
                    if !sync.add_sample(ClockSample::new(local_send, remote, now_millis())) {
                        tracing::warn!(attempt = i + 1, remote, "Host time out of range");
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt = i + 1, "Time query failed: {}", e);
                    sync.record_failure();
                }
            }
        }

        let offset = sync.finish()?;
        tracing::info!(
            %offset,
            samples = sync.sample_count(),
            rtt_spread = ?sync.round_trip_spread(),
            "Clock synced"
        );
        Ok((offset, sync.sample_count()))
    }

    async fn spawn_listener(
        &self,
        host: IpAddr,
        socket: UdpSocket,
        local_addr: SocketAddr,
        offset: ClockOffset,
        audio: Arc<DecodedAudio>,
    ) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ctx = TriggerContext {
            offset,
            audio,
            state: self.state.clone(),
            events: self.events.clone(),
            scheduler: self.scheduler.clone(),
            sink_factory: self.sink_factory.clone(),
            pending: self.pending.clone(),
        };
        let task = tokio::spawn(trigger::listen(Arc::new(socket), ctx, shutdown_rx));

        *self.listener.lock().await = Some(Listener {
            host,
            local_addr,
            shutdown_tx,
            task,
        });
    }

    /// Cancel any pending trigger, halt playback, close the listener and
    /// return to `Idle`
    ///
    /// Safe to call in any state.
    pub async fn stop(&self) {
        if let Some((_, playback)) = self.pending.lock().await.take() {
            playback.cancel();
        }

        if let Some(listener) = self.listener.lock().await.take() {
            let _ = listener.shutdown_tx.send(true);
            let _ = listener.task.await;
        }

        let old = self.state.reset().await;
        if old != ClientState::Idle {
            tracing::info!(from = %old, "Client session stopped");
            self.events.emit(ClientEvent::StateChanged {
                old,
                new: ClientState::Idle,
            });
        }
    }

    /// Leave `Error` (or any state) for `Idle` so `connect` can run again
    pub async fn retry(&self) {
        self.stop().await;
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_lock() {
            if let Some((_, playback)) = pending.take() {
                playback.cancel();
            }
        }
        if let Some(listener) = self.listener.get_mut().take() {
            let _ = listener.shutdown_tx.send(true);
        }
    }
}
