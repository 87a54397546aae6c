use super::server::{HttpContext, serve_audio};
use super::*;
use crate::audio::{AudioSink, DecodedAudio, NullSink, SinkFactory};
use crate::protocol::{ControlMessage, PayloadInfo, WavHeader};
use crate::registry::DeviceRegistry;
use crate::state::{EventBus, HostEvent};
use crate::types::{DeviceState, HostConfig};
use axum::extract::{ConnectInfo, State};
use reqwest::StatusCode;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{RwLock, watch};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

fn free_udp_port() -> u16 {
    std::net::UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn test_config() -> HostConfig {
    HostConfig::default()
        .bind_addr(LOCALHOST)
        .http_port(0)
        .control_port(0)
        .trigger_port(free_udp_port())
        .broadcast_addr(None)
}

fn test_audio() -> DecodedAudio {
    DecodedAudio::new(vec![0x11; 44_100 * 4], 44_100, 2, 16)
}

/// Write `request` verbatim and return everything the host sends back
async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut bytes = Vec::new();
    tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut bytes))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn get(addr: SocketAddr, path: &str) -> reqwest::Response {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
        .get(format!("http://{addr}{path}"))
        .send()
        .await
        .unwrap()
}

async fn started_host(config: HostConfig) -> (HostSession, SocketAddr, SocketAddr) {
    let host = HostSession::new(config);
    host.start().await.unwrap();
    let http = host.http_addr().await.unwrap();
    let control = host.control_addr().await.unwrap();
    (host, http, control)
}

#[tokio::test]
async fn test_start_and_stop_emit_events() {
    let host = HostSession::new(test_config());
    let mut rx = host.subscribe();

    host.start().await.unwrap();
    assert!(host.is_running().await);
    assert!(matches!(rx.recv().await.unwrap(), HostEvent::Started { .. }));

    host.stop().await;
    assert!(!host.is_running().await);
    assert!(matches!(rx.recv().await.unwrap(), HostEvent::Stopped));
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let host = HostSession::new(test_config());
    host.stop().await;
    host.start().await.unwrap();
    host.stop().await;
    host.stop().await;
    assert!(!host.is_running().await);
}

#[tokio::test]
async fn test_start_twice_restarts() {
    let host = HostSession::new(test_config());
    host.start().await.unwrap();
    host.registry().record_contact(LOCALHOST).await.unwrap();

    host.start().await.unwrap();

    assert!(host.is_running().await);
    assert!(host.devices().await.is_empty());
    host.stop().await;
}

#[tokio::test]
async fn test_time_endpoint() {
    let (host, http, _) = started_host(test_config()).await;

    let before = crate::clock::now_millis();
    let response = get(http, "/time").await;
    let after = crate::clock::now_millis();

    assert_eq!(response.status(), StatusCode::OK);
    let reported: i64 = response.text().await.unwrap().trim().parse().unwrap();
    assert!(reported >= before && reported <= after);
    host.stop().await;
}

#[tokio::test]
async fn test_audio_without_payload_is_unavailable() {
    let (host, http, _) = started_host(test_config()).await;

    let response = get(http, "/audio").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(host.devices().await.is_empty());
    host.stop().await;
}

#[tokio::test]
async fn test_audio_serves_wav_and_records_contact() {
    let (host, http, _) = started_host(test_config()).await;
    host.load_payload(test_audio()).await.unwrap();
    let mut rx = host.subscribe();

    let response = get(http, "/audio").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "audio/wav"
    );
    let body = response.bytes().await.unwrap();
    let header = WavHeader::decode(&body).unwrap();
    assert_eq!(header.sample_rate, 44_100);
    assert_eq!(header.channels, 2);
    assert_eq!(header.bits_per_sample, 16);
    assert_eq!(header.data_size as usize, 44_100 * 4);
    assert_eq!(body.len(), 44 + 44_100 * 4);

    match rx.recv().await.unwrap() {
        HostEvent::DeviceConnected { device } => {
            assert_eq!(device.address, LOCALHOST);
            assert_eq!(device.name, "Device-1");
            assert_eq!(device.state, DeviceState::AwaitingPayload);
        }
        other => panic!("unexpected event {other:?}"),
    }
    host.stop().await;
}

#[tokio::test]
async fn test_info_endpoint() {
    let (host, http, _) = started_host(test_config()).await;
    host.load_payload(test_audio()).await.unwrap();

    let response = get(http, "/info").await;

    assert_eq!(response.status(), StatusCode::OK);
    let info: PayloadInfo = response.text().await.unwrap().parse().unwrap();
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.channels, 2);
    assert_eq!(info.duration_ms, 1000);
    host.stop().await;
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let (host, http, _) = started_host(test_config()).await;

    assert_eq!(get(http, "/nope").await.status(), StatusCode::NOT_FOUND);
    host.stop().await;
}

#[tokio::test]
async fn test_non_get_rejected() {
    let (host, http, _) = started_host(test_config()).await;

    let response = send_raw(
        http,
        b"POST /time HTTP/1.1\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 405"), "{response}");
    host.stop().await;
}

#[tokio::test]
async fn test_malformed_request_does_not_stop_listener() {
    let (host, http, _) = started_host(test_config()).await;

    let response = send_raw(http, b"BREW /pot HTCPCP/1.0\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");

    assert_eq!(get(http, "/time").await.status(), StatusCode::OK);
    host.stop().await;
}

#[tokio::test]
async fn test_ready_datagram_marks_device_ready() {
    let (host, _, control) = started_host(test_config()).await;
    let mut rx = host.subscribe();

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(&ControlMessage::ready("Kitchen").encode(), control)
        .await
        .unwrap();

    // Unknown device: connected, then ready
    assert!(matches!(rx.recv().await.unwrap(), HostEvent::DeviceConnected { .. }));
    match rx.recv().await.unwrap() {
        HostEvent::DeviceReady { device } => assert_eq!(device.name, "Kitchen"),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(host.all_ready().await);
    host.stop().await;
}

#[tokio::test]
async fn test_malformed_datagram_dropped() {
    let (host, _, control) = started_host(test_config()).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"HELLO|there", control).await.unwrap();
    client.send_to(b"READY|", control).await.unwrap();
    client
        .send_to(&ControlMessage::ready("Den").encode(), control)
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while !host.all_ready().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let devices = host.devices().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Den");
    host.stop().await;
}

#[tokio::test]
async fn test_start_playback_requires_payload() {
    let (host, _, _) = started_host(test_config()).await;

    let err = host.start_playback().await.unwrap_err();

    assert!(matches!(err, crate::SyncError::InvalidState { .. }));
    host.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_playback_notifies_devices_and_plays_locally() {
    let config = test_config().trigger_delay(Duration::from_millis(200));
    let trigger_port = config.trigger_port;
    let sink = NullSink::default();
    let stats = sink.stats();
    let factory: SinkFactory = Arc::new(move || Box::new(sink.clone()) as Box<dyn AudioSink>);

    let host = HostSession::new(config).with_sink_factory(factory);
    host.start().await.unwrap();
    host.load_payload(test_audio()).await.unwrap();
    host.registry().mark_ready(LOCALHOST, "Loopback").await.unwrap();

    let device = UdpSocket::bind((LOCALHOST, trigger_port)).await.unwrap();
    let mut rx = host.subscribe();

    let before = crate::clock::now_millis();
    let command = host.start_playback().await.unwrap();
    assert!(command.instant_ms >= before + 200);

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(1), device.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        ControlMessage::decode(&buf[..len]),
        Some(ControlMessage::play_at(command.instant_ms))
    );

    assert!(matches!(
        rx.recv().await.unwrap(),
        HostEvent::PlaybackScheduled { recipients: 1, .. }
    ));
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, HostEvent::PlaybackStarted { .. }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(stats.plays(), 1);
    let played_at = crate::clock::timestamp::system_time_to_millis(stats.played_at().unwrap());
    assert!(played_at >= command.instant_ms);
    assert!(played_at - command.instant_ms < 20);
    host.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_cancels_pending_trigger() {
    let config = test_config().trigger_delay(Duration::from_millis(300));
    let sink = NullSink::default();
    let stats = sink.stats();
    let factory: SinkFactory = Arc::new(move || Box::new(sink.clone()) as Box<dyn AudioSink>);

    let host = HostSession::new(config).with_sink_factory(factory);
    host.start().await.unwrap();
    host.load_payload(test_audio()).await.unwrap();
    host.registry().record_contact(LOCALHOST).await.unwrap();

    host.start_playback().await.unwrap();
    host.stop().await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(stats.plays(), 0);
    assert!(host.devices().await.is_empty());
}

#[tokio::test]
async fn test_connection_opened_before_stop_cannot_register() {
    let (host, http, _) = started_host(test_config()).await;
    host.load_payload(test_audio()).await.unwrap();

    let mut stream = TcpStream::connect(http).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    host.stop().await;

    // The listener is gone; the write or the read may fail outright
    let _ = stream
        .write_all(b"GET /audio HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await;
    let mut response = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut response)).await;

    assert!(!response.starts_with(b"HTTP/1.1 200"));
    assert!(host.registry().is_empty().await);
    assert!(host.devices().await.is_empty());
}

#[tokio::test]
async fn test_audio_refused_while_stopping() {
    let registry = Arc::new(DeviceRegistry::new(EventBus::new()));
    let payload = LoadedPayload::new(test_audio()).unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctx = Arc::new(HttpContext {
        registry: registry.clone(),
        payload: Arc::new(RwLock::new(Some(Arc::new(payload)))),
        shutdown: shutdown_rx,
    });
    let peer = SocketAddr::new(LOCALHOST, 40_000);

    shutdown_tx.send(true).unwrap();
    let response = serve_audio(State(ctx.clone()), ConnectInfo(peer)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(registry.is_empty().await);

    shutdown_tx.send(false).unwrap();
    let response = serve_audio(State(ctx), ConnectInfo(peer)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_start_playback_replaces_trigger() {
    let config = test_config().trigger_delay(Duration::from_millis(150));
    let sink = NullSink::default();
    let stats = sink.stats();
    let factory: SinkFactory = Arc::new(move || Box::new(sink.clone()) as Box<dyn AudioSink>);

    let host = HostSession::new(config).with_sink_factory(factory);
    host.load_payload(test_audio()).await.unwrap();

    host.start_playback().await.unwrap();
    host.start_playback().await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(stats.plays(), 1);
}
