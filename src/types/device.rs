use std::fmt;
use std::net::IpAddr;
use std::time::SystemTime;

/// Lifecycle of a device within one hosting session
///
/// Ordered: a device only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceState {
    /// Contacted the host, payload not yet confirmed
    AwaitingPayload,
    /// Has the payload and is prepared to play
    Ready,
}

impl DeviceState {
    /// Whether the device can take part in playback
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == DeviceState::Ready
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::AwaitingPayload => f.write_str("awaiting payload"),
            DeviceState::Ready => f.write_str("ready"),
        }
    }
}

/// A remote participant known to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Network address; unique key within the registry
    pub address: IpAddr,

    /// Name shown on the host (generated until the client names itself)
    pub name: String,

    /// Lifecycle state
    pub state: DeviceState,

    /// Last time any message from this device was seen
    pub last_seen: SystemTime,
}

impl Device {
    /// Create a device record
    pub fn new(address: IpAddr, name: impl Into<String>, state: DeviceState) -> Self {
        Self {
            address,
            name: name.into(),
            state,
            last_seen: SystemTime::now(),
        }
    }

    /// Whether the device is ready
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }
}

/// Host-clock instant at which every device starts playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerCommand {
    /// Epoch milliseconds on the host clock
    pub instant_ms: i64,
}

impl TriggerCommand {
    /// Create a trigger for `instant_ms`
    #[must_use]
    pub const fn at(instant_ms: i64) -> Self {
        Self { instant_ms }
    }
}
