//! Bulk-transfer listener

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, watch};

use super::payload::LoadedPayload;
use crate::clock::now_millis;
use crate::registry::DeviceRegistry;

const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Shared state the HTTP handlers read
pub(crate) struct HttpContext {
    pub registry: Arc<DeviceRegistry>,
    pub payload: Arc<RwLock<Option<Arc<LoadedPayload>>>>,
    /// Flips to `true` once the session starts stopping
    pub shutdown: watch::Receiver<bool>,
}

impl HttpContext {
    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Routes served by the host
pub(crate) fn router(ctx: Arc<HttpContext>) -> Router {
    Router::new()
        .route("/audio", get(serve_audio))
        .route("/time", get(serve_time))
        .route("/info", get(serve_info))
        .with_state(ctx)
}

/// Serve until `shutdown` flips, then drain open connections
pub(crate) async fn serve(
    listener: TcpListener,
    ctx: Arc<HttpContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    let app = router(ctx).into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await;

    if let Err(e) = result {
        tracing::error!("HTTP server error: {}", e);
    }
    tracing::debug!("HTTP listener stopped");
}

pub(super) async fn serve_audio(
    State(ctx): State<Arc<HttpContext>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    // A request racing stop() must not repopulate the registry
    if ctx.stopping() {
        tracing::debug!(%peer, "Refusing payload request while stopping");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let Some(payload) = ctx.payload.read().await.clone() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    if let Err(e) = ctx.registry.record_contact(peer.ip()).await {
        tracing::error!(%peer, "Registry rejected contact: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let wav = payload.wav().clone();
    tracing::info!(%peer, bytes = wav.len(), "Payload served");
    ([(header::CONTENT_TYPE, WAV_CONTENT_TYPE)], wav).into_response()
}

async fn serve_time() -> String {
    now_millis().to_string()
}

async fn serve_info(State(ctx): State<Arc<HttpContext>>) -> Response {
    match ctx.payload.read().await.as_ref() {
        Some(payload) => payload.info().to_string().into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
