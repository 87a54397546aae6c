//! Bulk-transfer requests against the host

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::protocol::PayloadInfo;
use crate::types::{
    ClientConfig, DEFAULT_HTTP_PORT, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_REQUEST_TIMEOUT,
};

/// Requests a client makes against its host
#[async_trait]
pub trait HostTransport: Send + Sync {
    /// Download the payload (`GET /audio`)
    async fn fetch_payload(&self, host: IpAddr) -> Result<Vec<u8>>;

    /// Read the host clock (`GET /time`), in epoch milliseconds
    async fn fetch_time(&self, host: IpAddr) -> Result<i64>;

    /// Read payload metadata (`GET /info`)
    async fn fetch_info(&self, host: IpAddr) -> Result<PayloadInfo>;
}

/// Plain HTTP via a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    port: u16,
    timeout: Duration,
    max_size: usize,
}

impl HttpTransport {
    /// Create a transport targeting `port` on the host
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            client: build_client(),
            port,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Create from client configuration
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.http_port)
            .with_timeout(config.request_timeout)
            .with_max_size(config.max_payload_size)
    }

    /// Set the per-request timeout, covering connect through the last
    /// body byte
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the largest accepted response body
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Issue `GET path` and return the body of a successful response
    ///
    /// # Errors
    ///
    /// Returns `TransportUnreachable` if the host cannot be reached, closes
    /// early or sends more than the size limit, `Timeout` if it stalls, and
    /// `Http` on a non-2xx status.
    pub async fn get(&self, host: IpAddr, path: &str) -> Result<Vec<u8>> {
        let url = format!("http://{}{path}", SocketAddr::new(host, self.port));

        let mut response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| self.request_error(path, e))?;

        let advertised = response.content_length().unwrap_or(0);
        if advertised > u64::try_from(self.max_size).unwrap_or(u64::MAX) {
            return Err(self.too_large(path));
        }

        let mut body = Vec::with_capacity(usize::try_from(advertised).unwrap_or(0));
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.request_error(path, e))?
        {
            if body.len() + chunk.len() > self.max_size {
                return Err(self.too_large(path));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(%url, bytes = body.len(), "Response received");
        Ok(body)
    }

    fn request_error(&self, path: &str, e: reqwest::Error) -> SyncError {
        if e.is_timeout() {
            SyncError::Timeout {
                duration: self.timeout,
            }
        } else if let Some(status) = e.status() {
            SyncError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            }
        } else {
            SyncError::transport(format!("GET {path} failed"), e)
        }
    }

    fn too_large(&self, path: &str) -> SyncError {
        SyncError::TransportUnreachable {
            message: format!("{path} response exceeds {} bytes", self.max_size),
            source: None,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_PORT)
    }
}

fn build_client() -> reqwest::Client {
    // Hosts are LAN peers; an environment proxy must not intercept them
    reqwest::Client::builder()
        .no_proxy()
        .user_agent(concat!("synccast/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

fn body_text(body: Vec<u8>, what: &str) -> Result<String> {
    String::from_utf8(body).map_err(|_| SyncError::decode(format!("{what} response is not UTF-8")))
}

#[async_trait]
impl HostTransport for HttpTransport {
    async fn fetch_payload(&self, host: IpAddr) -> Result<Vec<u8>> {
        self.get(host, "/audio").await
    }

    async fn fetch_time(&self, host: IpAddr) -> Result<i64> {
        let text = body_text(self.get(host, "/time").await?, "time")?;
        text.trim()
            .parse()
            .map_err(|_| SyncError::decode(format!("invalid time response: {}", text.trim())))
    }

    async fn fetch_info(&self, host: IpAddr) -> Result<PayloadInfo> {
        body_text(self.get(host, "/info").await?, "info")?.trim().parse()
    }
}
