//! `PLAY_AT` listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{Mutex, watch};

use super::session::advance;
use crate::audio::{DecodedAudio, PlaybackJob, ScheduledPlayback, SinkFactory};
use crate::clock::{ClockOffset, system_time_from_millis};
use crate::protocol::ControlMessage;
use crate::protocol::control::MAX_DATAGRAM_SIZE;
use crate::scheduler::TriggerScheduler;
use crate::state::{ClientEvent, EventBus, StateContainer};
use crate::types::ClientState;

/// Host instant and the playback scheduled for it
pub(crate) type PendingTrigger = Arc<Mutex<Option<(i64, ScheduledPlayback)>>>;

/// Everything the listener needs to turn `PLAY_AT` into playback
pub(crate) struct TriggerContext {
    pub offset: ClockOffset,
    pub audio: Arc<DecodedAudio>,
    pub state: Arc<StateContainer>,
    pub events: EventBus<ClientEvent>,
    pub scheduler: TriggerScheduler,
    pub sink_factory: SinkFactory,
    pub pending: PendingTrigger,
}

/// Receive `PLAY_AT` datagrams until `shutdown` flips
pub(crate) async fn listen(
    socket: Arc<UdpSocket>,
    ctx: TriggerContext,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, src)) => handle_datagram(&buf[..len], src, &ctx).await,
                    Err(e) => tracing::warn!("Trigger receive error: {}", e),
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }
    tracing::debug!("Trigger listener stopped");
}

async fn handle_datagram(data: &[u8], src: SocketAddr, ctx: &TriggerContext) {
    match ControlMessage::decode(data) {
        Some(ControlMessage::PlayAt { instant_ms }) => {
            tracing::debug!(%src, instant_ms, "PLAY_AT received");
            handle_trigger(instant_ms, ctx).await;
        }
        Some(message @ ControlMessage::Ready { .. }) => {
            tracing::trace!(%src, %message, "Ignoring host-bound message on trigger port");
        }
        None => {
            tracing::trace!(%src, len = data.len(), "Dropping malformed datagram");
        }
    }
}

async fn handle_trigger(instant_ms: i64, ctx: &TriggerContext) {
    let mut pending = ctx.pending.lock().await;

    // Unicast and broadcast copies of one trigger both arrive
    if pending.as_ref().is_some_and(|(seen, _)| *seen == instant_ms) {
        tracing::trace!(instant_ms, "Duplicate PLAY_AT");
        return;
    }

    let current = ctx.state.state().await;
    if !matches!(current, ClientState::Ready | ClientState::Playing) {
        tracing::debug!(state = %current, "Ignoring PLAY_AT before sync completed");
        return;
    }

    let Some((local_instant_ms, target)) = ctx
        .offset
        .to_local(instant_ms)
        .and_then(|local| Some((local, system_time_from_millis(local)?)))
    else {
        tracing::trace!(instant_ms, offset = %ctx.offset, "Dropping out-of-range PLAY_AT");
        return;
    };

    if let Some((_, previous)) = pending.take() {
        tracing::debug!("Replacing pending trigger");
        previous.cancel();
    }

    let mut job = PlaybackJob::new((ctx.sink_factory)(), ctx.audio.clone());
    if let Err(e) = job.prime() {
        tracing::warn!("Priming sink failed: {}", e);
    }

    let events = ctx.events.clone();
    let on_start = move |lateness: Duration| {
        tracing::info!(?lateness, "Playback started");
        events.emit(ClientEvent::PlaybackStarted { lateness });
    };

    let playback = match ScheduledPlayback::schedule(&ctx.scheduler, target, Some(job), on_start) {
        Ok(playback) => playback,
        Err(e) => {
            tracing::error!("Cannot schedule playback: {}", e);
            return;
        }
    };
    *pending = Some((instant_ms, playback));
    drop(pending);

    tracing::info!(
        host_instant_ms = instant_ms,
        local_instant_ms,
        offset = %ctx.offset,
        "Playback scheduled"
    );
    ctx.events.emit(ClientEvent::TriggerScheduled {
        host_instant_ms: instant_ms,
        local_instant_ms,
    });

    if current == ClientState::Ready {
        if let Err(e) = advance(&ctx.state, &ctx.events, ClientState::Playing).await {
            tracing::warn!("State change rejected: {}", e);
        }
    }
}
