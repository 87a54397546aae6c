use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::clock::{DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_INTERVAL};
use crate::scheduler::DEFAULT_PRECISION_MARGIN;

/// Default bulk-transfer (HTTP) port on the host
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default host-bound datagram port (`READY`)
pub const DEFAULT_CONTROL_PORT: u16 = 9876;

/// Default client-bound datagram port (`PLAY_AT`)
pub const DEFAULT_TRIGGER_PORT: u16 = 9877;

/// Default lead time between issuing a trigger and playback start
pub const DEFAULT_TRIGGER_DELAY: Duration = Duration::from_millis(3000);

/// Default per-request timeout for client HTTP requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on a downloaded payload (512 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 512 * 1024 * 1024;

/// Host session configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Address the HTTP and control sockets bind to
    pub bind_addr: IpAddr,

    /// HTTP listen port (0 = auto-assign)
    pub http_port: u16,

    /// Control datagram listen port (0 = auto-assign)
    pub control_port: u16,

    /// Port clients listen on for `PLAY_AT`
    pub trigger_port: u16,

    /// Subnet broadcast address for `PLAY_AT` (None = unicast only)
    pub broadcast_addr: Option<IpAddr>,

    /// Lead time between `start_playback()` and the trigger instant
    pub trigger_delay: Duration,

    /// Busy-poll window before the trigger instant
    pub precision_margin: Duration,

    /// Play locally in sync with the clients
    pub local_playback: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            trigger_port: DEFAULT_TRIGGER_PORT,
            broadcast_addr: Some(IpAddr::V4(Ipv4Addr::BROADCAST)),
            trigger_delay: DEFAULT_TRIGGER_DELAY,
            precision_margin: DEFAULT_PRECISION_MARGIN,
            local_playback: true,
        }
    }
}

impl HostConfig {
    /// Set bind address
    #[must_use]
    pub fn bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set HTTP port
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Set control port
    #[must_use]
    pub fn control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Set trigger port
    #[must_use]
    pub fn trigger_port(mut self, port: u16) -> Self {
        self.trigger_port = port;
        self
    }

    /// Set or disable the broadcast address
    #[must_use]
    pub fn broadcast_addr(mut self, addr: Option<IpAddr>) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Set trigger lead time
    #[must_use]
    pub fn trigger_delay(mut self, delay: Duration) -> Self {
        self.trigger_delay = delay;
        self
    }

    /// Set busy-poll window
    #[must_use]
    pub fn precision_margin(mut self, margin: Duration) -> Self {
        self.precision_margin = margin;
        self
    }

    /// Enable or disable local playback on the host
    #[must_use]
    pub fn local_playback(mut self, enabled: bool) -> Self {
        self.local_playback = enabled;
        self
    }
}

/// Client session configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name announced in `READY`
    pub display_name: String,

    /// Host HTTP port
    pub http_port: u16,

    /// Host control port (`READY` destination)
    pub control_port: u16,

    /// Local port to receive `PLAY_AT` on
    pub trigger_port: u16,

    /// Address the trigger listener binds to
    pub bind_addr: IpAddr,

    /// Number of time queries per sync session
    pub sample_count: usize,

    /// Pause between time queries
    pub sample_interval: Duration,

    /// Timeout for each bulk-transfer request
    pub request_timeout: Duration,

    /// Largest payload accepted from the host
    pub max_payload_size: usize,

    /// Busy-poll window before the trigger instant
    pub precision_margin: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            http_port: DEFAULT_HTTP_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            trigger_port: DEFAULT_TRIGGER_PORT,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            sample_count: DEFAULT_SAMPLE_COUNT,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            precision_margin: DEFAULT_PRECISION_MARGIN,
        }
    }
}

impl ClientConfig {
    /// Create with custom display name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
            ..Default::default()
        }
    }

    /// Set host HTTP port
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Set host control port
    #[must_use]
    pub fn control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    /// Set local trigger port
    #[must_use]
    pub fn trigger_port(mut self, port: u16) -> Self {
        self.trigger_port = port;
        self
    }

    /// Set trigger listener bind address
    #[must_use]
    pub fn bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set number and spacing of time queries
    #[must_use]
    pub fn sampling(mut self, count: usize, interval: Duration) -> Self {
        self.sample_count = count;
        self.sample_interval = interval;
        self
    }

    /// Set per-request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set busy-poll window
    #[must_use]
    pub fn precision_margin(mut self, margin: Duration) -> Self {
        self.precision_margin = margin;
        self
    }
}

fn default_display_name() -> String {
    hostname::get().map_or_else(
        |_| "synccast-client".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}
