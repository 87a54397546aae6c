//! Control datagram codec
//!
//! Control frames are short UTF-8 text datagrams of the form
//! `<PREFIX>|<argument>`:
//!
//! - `READY|<display_name>` (client to host)
//! - `PLAY_AT|<epoch_millis>` (host to clients, also broadcast)
//!
//! Decoding never fails loudly: anything that does not parse is `None`
//! and the listener drops it.

use std::fmt;

/// Prefix of the readiness frame
pub const READY_PREFIX: &str = "READY";
/// Prefix of the play-trigger frame
pub const PLAY_AT_PREFIX: &str = "PLAY_AT";
/// Separator between prefix and argument
pub const SEPARATOR: char = '|';

/// Largest control datagram we expect to receive
pub const MAX_DATAGRAM_SIZE: usize = 512;

/// Longest display name, in bytes, that fits a `READY` frame
pub const MAX_NAME_LEN: usize = MAX_DATAGRAM_SIZE - READY_PREFIX.len() - SEPARATOR.len_utf8();

/// A decoded control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Client has the payload and is prepared to play
    Ready {
        /// Name shown for this client on the host
        display_name: String,
    },
    /// Start playback at this host-clock instant
    PlayAt {
        /// Epoch milliseconds on the host clock
        instant_ms: i64,
    },
}

impl ControlMessage {
    /// Create a readiness frame
    ///
    /// Names longer than [`MAX_NAME_LEN`] bytes are cut at the last
    /// character boundary that fits.
    pub fn ready(display_name: impl Into<String>) -> Self {
        let mut display_name = display_name.into();
        let len = fit_name(&display_name).len();
        display_name.truncate(len);
        Self::Ready { display_name }
    }

    /// Create a play-trigger frame
    #[must_use]
    pub fn play_at(instant_ms: i64) -> Self {
        Self::PlayAt { instant_ms }
    }

    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode a received datagram
    ///
    /// Returns `None` for non-UTF-8 data, unknown prefixes, a missing
    /// separator, an empty display name or a non-numeric instant.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(data).ok()?.trim();
        let (prefix, argument) = text.split_once(SEPARATOR)?;

        match prefix {
            READY_PREFIX => {
                let name = argument.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Self::ready(name))
            }
            PLAY_AT_PREFIX => argument.trim().parse::<i64>().ok().map(Self::play_at),
            _ => None,
        }
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready { display_name } => {
                write!(f, "{READY_PREFIX}{SEPARATOR}{}", fit_name(display_name))
            }
            Self::PlayAt { instant_ms } => write!(f, "{PLAY_AT_PREFIX}{SEPARATOR}{instant_ms}"),
        }
    }
}

fn fit_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
