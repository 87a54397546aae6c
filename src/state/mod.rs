//! Session state and events

mod container;
mod events;

pub use container::{SessionSnapshot, StateContainer};
pub use events::{ClientEvent, EventBus, EventFilter, HostEvent};
