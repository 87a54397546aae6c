use std::io;
use std::net::IpAddr;
use thiserror::Error;

/// Errors that can occur while hosting or joining a synchronized session
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Transport Errors =====
    /// Bulk transfer or datagram send failed
    #[error("transport unreachable: {message}")]
    TransportUnreachable {
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bulk transfer answered with a non-success status
    #[error("unexpected HTTP status {status} for {path}")]
    Http {
        /// Status code returned by the host
        status: u16,
        /// Requested path
        path: String,
    },

    /// Operation timed out
    #[error("operation timed out after {duration:?}")]
    Timeout {
        /// The duration of the timeout
        duration: std::time::Duration,
    },

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    // ===== Payload Errors =====
    /// Payload cannot be turned into raw samples
    #[error("decode failure: {message}")]
    DecodeFailure {
        /// Description of the failure
        message: String,
    },

    /// Audio sink rejected an operation
    #[error("audio sink error: {message}")]
    Sink {
        /// Description of the failure
        message: String,
    },

    // ===== Sync Errors =====
    /// Clock sync got zero usable round trips
    #[error("insufficient clock samples: 0 of {attempted} round trips succeeded")]
    InsufficientSamples {
        /// Number of time queries that were attempted
        attempted: usize,
    },

    /// Control datagram failed to parse
    #[error("malformed control message: {message}")]
    MalformedMessage {
        /// Description of the problem
        message: String,
    },

    // ===== State Errors =====
    /// Two live records for one address were observed
    #[error("conflicting device records for {address}")]
    DeviceRecordConflict {
        /// The address with more than one record
        address: IpAddr,
    },

    /// Operation not valid in current state
    #[error("invalid state: {message} (current: {current_state})")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
        /// The current state
        current_state: String,
    },
}

impl SyncError {
    /// Build a `TransportUnreachable` error from any source error
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TransportUnreachable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a `DecodeFailure` error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable by retrying the session
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TransportUnreachable { .. }
                | Self::Timeout { .. }
                | Self::Network(_)
                | Self::InsufficientSamples { .. }
        )
    }

    /// Check if this error originated in the transport layer
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::TransportUnreachable { .. }
                | Self::Http { .. }
                | Self::Timeout { .. }
                | Self::Network(_)
        )
    }
}

/// Result type alias for synccast operations
pub type Result<T> = std::result::Result<T, SyncError>;
