//! Devices known to a hosting session
//!
//! One record per network address. Records are created on first contact
//! (payload fetch or `READY`), mutated in place and dropped only by
//! [`DeviceRegistry::clear`]. Every mutation and the notification it
//! produces happen under a single lock, so subscribers observe events in
//! the order the table changed.


use std::net::IpAddr;
use std::time::SystemTime;

use tokio::sync::Mutex;

use crate::error::{Result, SyncError};
use crate::state::{EventBus, HostEvent};
use crate::types::{Device, DeviceState};

/// Thread-safe table of devices keyed by address
pub struct DeviceRegistry {
    devices: Mutex<Vec<Device>>,
    events: EventBus<HostEvent>,
}

impl DeviceRegistry {
    /// Create an empty registry publishing to `events`
    #[must_use]
    pub fn new(events: EventBus<HostEvent>) -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Record that `address` contacted the host
    ///
    /// Returns the existing record (with `last_seen` refreshed) or a new
    /// `AwaitingPayload` record named `Device-N`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceRecordConflict` if the table holds more than one
    /// record for `address`.
    pub async fn record_contact(&self, address: IpAddr) -> Result<Device> {
        let mut devices = self.devices.lock().await;

        if let Some(index) = find(&devices, address)? {
            let device = &mut devices[index];
            device.last_seen = SystemTime::now();
            return Ok(device.clone());
        }

        let name = format!("Device-{}", devices.len() + 1);
        let device = Device::new(address, name, DeviceState::AwaitingPayload);
        devices.push(device.clone());

        tracing::info!(%address, name = %device.name, "Device connected");
        self.events.emit(HostEvent::DeviceConnected {
            device: device.clone(),
        });

        Ok(device)
    }

    /// Record that `address` holds the payload
    ///
    /// The latest name wins. A device never seen before is created
    /// directly in `Ready`, announcing both connection and readiness.
    ///
    /// # Errors
    ///
    /// Returns `DeviceRecordConflict` if the table holds more than one
    /// record for `address`.
    pub async fn mark_ready(&self, address: IpAddr, name: &str) -> Result<Device> {
        let mut devices = self.devices.lock().await;

        let device = if let Some(index) = find(&devices, address)? {
            let device = &mut devices[index];
            device.name = name.to_string();
            device.state = DeviceState::Ready;
            device.last_seen = SystemTime::now();
            device.clone()
        } else {
            let device = Device::new(address, name, DeviceState::Ready);
            devices.push(device.clone());
            self.events.emit(HostEvent::DeviceConnected {
                device: device.clone(),
            });
            device
        };

        tracing::info!(%address, name, "Device ready");
        self.events.emit(HostEvent::DeviceReady {
            device: device.clone(),
        });

        Ok(device)
    }

    /// Copy of all records in insertion order
    pub async fn snapshot(&self) -> Vec<Device> {
        self.devices.lock().await.clone()
    }

    /// Addresses of all records in insertion order
    pub async fn addresses(&self) -> Vec<IpAddr> {
        self.devices.lock().await.iter().map(|d| d.address).collect()
    }

    /// Record for `address`, if any
    pub async fn get(&self, address: IpAddr) -> Option<Device> {
        self.devices
            .lock()
            .await
            .iter()
            .find(|d| d.address == address)
            .cloned()
    }

    /// True when at least one device is known and every device is ready
    pub async fn all_ready(&self) -> bool {
        let devices = self.devices.lock().await;
        !devices.is_empty() && devices.iter().all(Device::is_ready)
    }

    /// Number of records
    pub async fn len(&self) -> usize {
        self.devices.lock().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.devices.lock().await.is_empty()
    }

    /// Remove every record
    pub async fn clear(&self) {
        let mut devices = self.devices.lock().await;
        if !devices.is_empty() {
            tracing::debug!(count = devices.len(), "Clearing device registry");
        }
        devices.clear();
    }

    /// Event bus the registry publishes to
    #[must_use]
    pub fn events(&self) -> &EventBus<HostEvent> {
        &self.events
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(EventBus::new())
    }
}

fn find(devices: &[Device], address: IpAddr) -> Result<Option<usize>> {
    let mut matches = devices
        .iter()
        .enumerate()
        .filter(|(_, d)| d.address == address)
        .map(|(i, _)| i);

    let first = matches.next();
    if matches.next().is_some() {
        return Err(SyncError::DeviceRecordConflict { address });
    }
    Ok(first)
}
