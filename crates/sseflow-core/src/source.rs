//! The event source: connection state machine plus read loop.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dispatch::{Dispatcher, Listener, listener};
use crate::error::SourceError;
use crate::event::{ERROR, MESSAGE, MessageEvent, OPEN, Propagation};
use crate::handle::{Shared, SourceHandle};
use crate::parser::ChunkParser;
use crate::request::StreamRequest;
use crate::state::ReadyState;
use crate::transport::{ChunkReader, ReadResult, Transport};

/// A client for one Server-Sent Events stream.
///
/// Register listeners, then drive the connection with [`run`](Self::run)
/// or [`spawn`](Self::spawn). All parsing and dispatch happen inside that
/// single loop; listeners run inline and should not block.
pub struct EventSource {
    request: StreamRequest,
    transport: Arc<dyn Transport>,
    state: ReadyState,
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
    parser: ChunkParser,
    reader: Option<Box<dyn ChunkReader>>,
    last_event_id: Option<String>,
}

impl EventSource {
    pub fn new(request: StreamRequest, transport: Arc<dyn Transport>) -> Self {
        Self {
            request,
            transport,
            state: ReadyState::Initializing,
            shared: Shared::new(),
            dispatcher: Dispatcher::new(),
            parser: ChunkParser::new(),
            reader: None,
            last_event_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id()
    }

    pub fn request(&self) -> &StreamRequest {
        &self.request
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state
    }

    /// The id of the most recent record that carried an `id:` field.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Characters received from the transport so far.
    pub fn chars_seen(&self) -> usize {
        self.parser.progress()
    }

    /// A non-owning handle for observing or closing this source.
    pub fn handle(&self) -> SourceHandle {
        SourceHandle::new(&self.shared)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Simple mode: make `callback` the only listener for `event_type`,
    /// with `data` decoded as JSON where possible.
    pub fn on<F, R>(&mut self, event_type: impl Into<String>, callback: F)
    where
        F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation> + 'static,
    {
        self.dispatcher.on(event_type, callback);
    }

    pub fn off(&mut self, event_type: &str) {
        self.dispatcher.off(event_type);
    }

    /// Advanced mode: append a raw-data listener.
    pub fn add_listener(&mut self, event_type: impl Into<String>, listener: Listener) {
        self.dispatcher.add_listener(event_type, listener);
    }

    pub fn remove_listener(&mut self, event_type: &str, listener: &Listener) {
        self.dispatcher.remove_listener(event_type, listener);
    }

    /// Install the designated handler that runs before any listener of
    /// `event_type`.
    pub fn set_handler(&mut self, event_type: impl Into<String>, handler: Listener) {
        self.dispatcher.set_handler(event_type, handler);
    }

    pub fn clear_handler(&mut self, event_type: &str) {
        self.dispatcher.clear_handler(event_type);
    }

    pub fn on_open<F, R>(&mut self, f: F)
    where
        F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation> + 'static,
    {
        self.set_handler(OPEN, listener(f));
    }

    pub fn on_message<F, R>(&mut self, f: F)
    where
        F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation> + 'static,
    {
        self.set_handler(MESSAGE, listener(f));
    }

    pub fn on_error<F, R>(&mut self, f: F)
    where
        F: Fn(&MessageEvent) -> R + Send + Sync + 'static,
        R: Into<Propagation> + 'static,
    {
        self.set_handler(ERROR, listener(f));
    }

    // -----------------------------------------------------------------------
    // Dispatch and lifecycle
    // -----------------------------------------------------------------------

    /// Deliver an event from this source. An absent event is a no-op.
    ///
    /// Returns `false` when a callback stopped propagation.
    pub fn dispatch(&self, event: Option<MessageEvent>) -> bool {
        let Some(mut event) = event else {
            return true;
        };
        event.source = Some(self.handle());
        self.dispatcher.dispatch(&event)
    }

    /// Close the source. Does nothing once closed.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.reader = None;
        self.transition(ReadyState::Closed);
    }

    /// Connect and read until the stream ends, fails, or is closed.
    ///
    /// Only the first call does anything.
    #[tracing::instrument(
        name = "event_source",
        skip(self),
        fields(id = %self.shared.id(), url = %self.request.url)
    )]
    pub async fn run(&mut self) {
        match self.state {
            ReadyState::Initializing => {}
            ReadyState::Closed => {
                tracing::debug!("event source closed before start");
                return;
            }
            state => {
                tracing::warn!(%state, "event source already started");
                return;
            }
        }

        self.transition(ReadyState::Connecting);
        if self.shared.close_requested() {
            self.close();
            return;
        }

        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.shared);

        let opened = tokio::select! {
            result = transport.open(&self.request) => Some(result),
            _ = shared.close_signal() => None,
        };
        let response = match opened {
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                self.fail(e);
                return;
            }
            None => {
                self.close();
                return;
            }
        };

        tracing::debug!(status = response.status, "stream response received");
        if !response.is_success() {
            self.fail(SourceError::Status {
                status: response.status,
                status_text: response.status_text.clone(),
            });
        }
        match response.body {
            Some(body) if !self.state.is_closed() => self.reader = Some(body),
            Some(_) => {}
            None => self.fail(SourceError::MissingBody),
        }

        loop {
            if self.shared.close_requested() {
                self.close();
                break;
            }
            let Some(reader) = self.reader.as_mut() else {
                break;
            };

            let read = tokio::select! {
                result = reader.read() => Some(result),
                _ = shared.close_signal() => None,
            };
            match read {
                None => {
                    self.close();
                    break;
                }
                Some(Err(e)) => {
                    self.fail(e);
                    break;
                }
                Some(Ok(ReadResult::Done)) => {
                    self.finish_stream();
                    break;
                }
                Some(Ok(ReadResult::Chunk(text))) => self.handle_chunk(&text),
            }
        }
    }

    /// Run this source on a new tokio task.
    pub fn spawn(mut self) -> (SourceHandle, JoinHandle<()>) {
        let handle = self.handle();
        let task = tokio::spawn(async move { self.run().await });
        (handle, task)
    }

    fn handle_chunk(&mut self, text: &str) {
        if self.state == ReadyState::Connecting {
            self.dispatch(Some(MessageEvent::open()));
            if self.shared.close_requested() {
                return;
            }
            self.transition(ReadyState::Open);
        }

        for event in self.parser.feed(text) {
            if self.shared.close_requested() || self.state.is_closed() {
                break;
            }
            self.dispatch_record(event);
        }
    }

    fn finish_stream(&mut self) {
        if let Some(event) = self.parser.finish() {
            if !self.shared.close_requested() {
                self.dispatch_record(event);
            }
        }
        tracing::debug!(chars = self.parser.progress(), "stream ended");
        self.close();
    }

    fn dispatch_record(&mut self, event: MessageEvent) {
        if let Some(id) = &event.id {
            self.last_event_id = Some(id.clone());
        }
        tracing::debug!(event_type = %event.event_type, id = ?event.id, "dispatching record");
        self.dispatch(Some(event));
    }

    fn fail(&mut self, err: SourceError) {
        if self.state.is_closed() {
            return;
        }
        tracing::warn!(error = %err, "event stream failed");
        let payload = serde_json::to_value(err.payload()).unwrap_or(Value::Null);
        self.dispatch(Some(MessageEvent::error(payload)));
        self.close();
    }

    fn transition(&mut self, next: ReadyState) {
        if !self.state.can_transition_to(next) {
            tracing::debug!(from = %self.state, to = %next, "ignoring state transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "ready state change");
        self.state = next;
        self.shared.store_state(next);
        self.dispatch(Some(MessageEvent::ready_state_change(next)));
    }
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("id", &self.shared.id())
            .field("url", &self.request.url)
            .field("method", &self.request.method)
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use crate::mock::MockTransport;
    use std::sync::Mutex;

    fn source(transport: MockTransport) -> EventSource {
        let request = StreamRequest::get("http://test/events", &SourceConfig::default());
        EventSource::new(request, Arc::new(transport))
    }

    fn record_types(source: &mut EventSource, types: &[&str]) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for t in types {
            let log = log.clone();
            source.add_listener(
                *t,
                listener(move |e: &MessageEvent| {
                    let entry = match e.ready_state {
                        Some(state) => format!("{}:{state}", e.event_type),
                        None => e.event_type.clone(),
                    };
                    log.lock().unwrap().push(entry);
                }),
            );
        }
        log
    }

    #[test]
    fn new_source_is_initializing() {
        let s = source(MockTransport::with_chunks(&[]));
        assert_eq!(s.ready_state(), ReadyState::Initializing);
        assert!(s.last_event_id().is_none());
        assert_eq!(s.handle().ready_state(), ReadyState::Initializing);
    }

    #[test]
    fn close_before_start_dispatches_once() {
        let mut s = source(MockTransport::with_chunks(&[]));
        let log = record_types(&mut s, &["readystatechange"]);
        s.close();
        s.close();
        assert_eq!(s.ready_state(), ReadyState::Closed);
        assert_eq!(*log.lock().unwrap(), vec!["readystatechange:closed"]);
    }

    #[tokio::test]
    async fn run_after_close_does_nothing() {
        let transport = MockTransport::with_chunks(&["data: x\n\n"]);
        let requests = transport.requests();
        let mut s = source(transport);
        s.close();
        s.run().await;
        assert!(requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_twice_is_ignored() {
        let transport = MockTransport::with_chunks(&["data: x\n\n"]);
        let requests = transport.requests();
        let mut s = source(transport);
        s.run().await;
        s.run().await;
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_stamps_provenance() {
        let mut s = source(MockTransport::with_chunks(&["data: x\n\n"]));
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        s.add_listener(
            "message",
            listener(move |e: &MessageEvent| *sink.lock().unwrap() = e.source.clone()),
        );
        let expected = s.handle();
        s.run().await;
        assert_eq!(seen.lock().unwrap().clone(), Some(expected));
    }

    #[test]
    fn dispatch_absent_event_is_not_cancelled() {
        let s = source(MockTransport::with_chunks(&[]));
        assert!(s.dispatch(None));
    }

    #[tokio::test]
    async fn last_event_id_tracks_records() {
        let mut s = source(MockTransport::with_chunks(&[
            "id: 1\ndata: a\n\n",
            "data: b\n\nid: 3\ndata: c\n\n",
        ]));
        s.run().await;
        assert_eq!(s.last_event_id(), Some("3"));
        assert_eq!(s.chars_seen(), "id: 1\ndata: a\n\ndata: b\n\nid: 3\ndata: c\n\n".len());
    }
}
