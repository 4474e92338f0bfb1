//! Listener registry and event dispatch.
//!
//! Two registration modes exist per event type:
//!
//! - **simple** (`on`/`off`): one callback per type, `data` decoded as JSON
//!   when possible;
//! - **advanced** (`add_listener`/`remove_listener`): an ordered list of
//!   listeners that see the raw payload.
//!
//! They are not meant to be mixed for the same type: `on` replaces every
//! listener registered for that type.
//!
//! Separately, each type may have one designated handler which runs before
//! any listener.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::event::{MessageEvent, Propagation};

/// A shareable event callback. Identity (`Arc::ptr_eq`) is used for
/// de-duplication and removal.
pub type Listener = Arc<dyn Fn(&MessageEvent) -> Propagation + Send + Sync>;

/// Wrap a closure into a [`Listener`].
///
/// Closures may return `()` (always continue), `bool` (`false` stops) or
/// [`Propagation`].
pub fn listener<F, R>(f: F) -> Listener
where
    F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
    R: Into<Propagation> + 'static,
{
    Arc::new(move |event: &MessageEvent| -> Propagation { f(event).into() })
}

/// Decode a string payload as JSON.
///
/// Empty strings and `Null` become `Null`; text that is not valid JSON is
/// returned unchanged. Non-string values pass through.
pub fn decode_data(data: &Value) -> Value {
    match data {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| data.clone()),
        other => other.clone(),
    }
}

#[derive(Default)]
pub struct Dispatcher {
    listeners: HashMap<String, Vec<Listener>>,
    handlers: HashMap<String, Listener>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` for `event_type` unless that same listener is
    /// already registered.
    pub fn add_listener(&mut self, event_type: impl Into<String>, listener: Listener) {
        let list = self.listeners.entry(event_type.into()).or_default();
        if !list.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            list.push(listener);
        }
    }

    /// Remove `listener` by identity. The type entry disappears with its
    /// last listener.
    pub fn remove_listener(&mut self, event_type: &str, listener: &Listener) {
        if let Some(list) = self.listeners.get_mut(event_type) {
            list.retain(|l| !Arc::ptr_eq(l, listener));
            if list.is_empty() {
                self.listeners.remove(event_type);
            }
        }
    }

    /// Replace every listener for `event_type` with one callback that
    /// receives JSON-decoded data.
    pub fn on<F, R>(&mut self, event_type: impl Into<String>, callback: F)
    where
        F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation> + 'static,
    {
        let wrapped = listener(move |event: &MessageEvent| -> Propagation {
            let decoded = MessageEvent {
                data: decode_data(&event.data),
                ..event.clone()
            };
            callback(&decoded).into()
        });
        self.listeners.insert(event_type.into(), vec![wrapped]);
    }

    pub fn off(&mut self, event_type: &str) {
        self.listeners.remove(event_type);
    }

    /// Install the designated handler for `event_type`, replacing any
    /// previous one.
    pub fn set_handler(&mut self, event_type: impl Into<String>, handler: Listener) {
        self.handlers.insert(event_type.into(), handler);
    }

    pub fn clear_handler(&mut self, event_type: &str) {
        self.handlers.remove(event_type);
    }

    pub fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners.get(event_type).map_or(0, Vec::len)
    }

    /// Deliver `event` to the designated handler, then to listeners in
    /// registration order.
    ///
    /// Returns `false` when a callback stopped propagation.
    pub fn dispatch(&self, event: &MessageEvent) -> bool {
        if let Some(handler) = self.handlers.get(&event.event_type) {
            if handler(event).is_stop() {
                return false;
            }
        }

        let Some(list) = self.listeners.get(&event.event_type) else {
            return true;
        };
        for l in list {
            if l(event).is_stop() {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        let handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        f.debug_struct("Dispatcher")
            .field("listeners", &counts)
            .field("handlers", &handlers)
            .finish()
    }
}
