//! Core types

mod config;
mod device;
mod state;


pub use config::{
    ClientConfig, DEFAULT_CONTROL_PORT, DEFAULT_HTTP_PORT, DEFAULT_MAX_PAYLOAD_SIZE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TRIGGER_DELAY, DEFAULT_TRIGGER_PORT, HostConfig,
};
pub use device::{Device, DeviceState, TriggerCommand};
pub use state::ClientState;
