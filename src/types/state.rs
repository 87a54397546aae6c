use std::fmt;

/// Client session state machine
///
/// ```text
/// Idle -> Connecting -> Downloading -> Syncing -> Ready -> Playing
///             \______________\______________\
///                                            -> Error
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClientState {
    /// No host yet
    #[default]
    Idle,
    /// Host address known, requesting the payload
    Connecting,
    /// Payload transfer in progress
    Downloading,
    /// Measuring the clock offset
    Syncing,
    /// Offset known, waiting for the trigger
    Ready,
    /// Trigger received, playback scheduled or running
    Playing,
    /// Terminal until `retry()`
    Error(String),
}

impl ClientState {
    /// Check whether `next` is a legal successor of this state
    #[must_use]
    pub fn can_transition_to(&self, next: &ClientState) -> bool {
        use ClientState::{Connecting, Downloading, Error, Idle, Playing, Ready, Syncing};

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Downloading)
                | (Downloading, Syncing)
                | (Syncing, Ready)
                | (Ready, Playing)
                | (Connecting | Downloading | Syncing, Error(_))
                | (_, Idle)
        )
    }

    /// Whether this is the error state
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ClientState::Error(_))
    }

    /// Short name without the error message
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientState::Idle => "idle",
            ClientState::Connecting => "connecting",
            ClientState::Downloading => "downloading",
            ClientState::Syncing => "syncing",
            ClientState::Ready => "ready",
            ClientState::Playing => "playing",
            ClientState::Error(_) => "error",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Error(message) => write!(f, "error: {message}"),
            other => f.write_str(other.name()),
        }
    }
}
