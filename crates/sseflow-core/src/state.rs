use serde::{Deserialize, Serialize};

/// Lifecycle phase of an event source.
///
/// The numeric values follow the `readyState` convention of streaming HTTP
/// clients, with `Initializing` added before the first connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i8)]
pub enum ReadyState {
    /// No connection attempt has been made yet.
    Initializing = -1,
    /// Request issued, no data received.
    Connecting = 0,
    /// At least one chunk of data has arrived.
    Open = 1,
    /// Terminal: the stream ended, failed, or was closed.
    Closed = 2,
}

impl ReadyState {
    pub const INITIALIZING: i8 = ReadyState::Initializing as i8;
    pub const CONNECTING: i8 = ReadyState::Connecting as i8;
    pub const OPEN: i8 = ReadyState::Open as i8;
    pub const CLOSED: i8 = ReadyState::Closed as i8;

    pub fn as_i8(self) -> i8 {
        self as i8
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Transitions only move forward, `Closed` is reachable from anywhere,
    /// and nothing leaves `Closed`.
    pub fn can_transition_to(self, next: ReadyState) -> bool {
        match (self, next) {
            (Self::Closed, _) => false,
            (_, Self::Closed) => true,
            (current, next) => next > current,
        }
    }
}

impl TryFrom<i8> for ReadyState {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Initializing),
            0 => Ok(Self::Connecting),
            1 => Ok(Self::Open),
            2 => Ok(Self::Closed),
            other => Err(format!("unknown ready state: {other}")),
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
