//! Control datagram listener

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::protocol::ControlMessage;
use crate::protocol::control::MAX_DATAGRAM_SIZE;
use crate::registry::DeviceRegistry;

/// Receive `READY` datagrams until `shutdown` flips
pub(crate) async fn listen(
    socket: UdpSocket,
    registry: Arc<DeviceRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, src)) => handle_datagram(&buf[..len], src, &registry).await,
                    Err(e) => tracing::warn!("Control receive error: {}", e),
                }
            }
            _ = shutdown.changed() => {
                break;
            }
        }
    }
    tracing::debug!("Control listener stopped");
}

async fn handle_datagram(data: &[u8], src: SocketAddr, registry: &DeviceRegistry) {
    match ControlMessage::decode(data) {
        Some(ControlMessage::Ready { display_name }) => {
            tracing::debug!(%src, name = %display_name, "READY received");
            if let Err(e) = registry.mark_ready(src.ip(), &display_name).await {
                tracing::warn!(%src, "Dropping READY: {}", e);
            }
        }
        Some(message @ ControlMessage::PlayAt { .. }) => {
            tracing::trace!(%src, %message, "Ignoring client-bound message on control port");
        }
        None => {
            tracing::trace!(%src, len = data.len(), "Dropping malformed datagram");
        }
    }
}
