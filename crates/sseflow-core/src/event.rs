use serde_json::Value;

use crate::handle::SourceHandle;
use crate::state::ReadyState;

/// Event type dispatched once when the first chunk arrives.
pub const OPEN: &str = "open";
/// Default type of records without an `event:` field.
pub const MESSAGE: &str = "message";
/// Event type dispatched on transport or stream failure.
pub const ERROR: &str = "error";
/// Event type dispatched on every state transition.
pub const READY_STATE_CHANGE: &str = "readystatechange";

/// A dispatched event.
///
/// Records parsed off the wire carry their `data` as a JSON string value;
/// simple-mode listeners registered with `on` see it decoded. Lifecycle
/// events carry `Null`, and `error` events carry a serialized
/// [`ErrorPayload`](crate::error::ErrorPayload).
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub event_type: String,
    pub data: Value,
    pub id: Option<String>,
    /// Present only on `readystatechange` events.
    pub ready_state: Option<ReadyState>,
    /// The source that dispatched this event. Set during dispatch.
    pub source: Option<SourceHandle>,
}

impl MessageEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            id: None,
            ready_state: None,
            source: None,
        }
    }

    pub fn open() -> Self {
        Self::new(OPEN, Value::Null)
    }

    pub fn error(payload: Value) -> Self {
        Self::new(ERROR, payload)
    }

    pub fn ready_state_change(state: ReadyState) -> Self {
        Self {
            ready_state: Some(state),
            ..Self::new(READY_STATE_CHANGE, Value::Null)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The raw `data` text, when the payload is still a string.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_str()
    }
}

/// Decision returned by a listener after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Keep delivering the event to later listeners.
    #[default]
    Continue,
    /// Stop delivery; the dispatch reports the event as cancelled.
    Stop,
}

impl Propagation {
    pub fn is_stop(self) -> bool {
        self == Self::Stop
    }
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

impl From<bool> for Propagation {
    /// `true` means "keep going", mirroring the return value of dispatch.
    fn from(keep_going: bool) -> Self {
        if keep_going { Self::Continue } else { Self::Stop }
    }
}
