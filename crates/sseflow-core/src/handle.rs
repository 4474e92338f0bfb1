use std::sync::atomic::{AtomicBool, AtomicI8, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::Notify;
use uuid::Uuid;

use crate::state::ReadyState;

/// State shared between an `EventSource` and its handles.
#[derive(Debug)]
pub(crate) struct Shared {
    id: Uuid,
    state: AtomicI8,
    close_requested: AtomicBool,
    wake: Notify,
}

impl Shared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            state: AtomicI8::new(ReadyState::INITIALIZING),
            close_requested: AtomicBool::new(false),
            wake: Notify::new(),
        })
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn state(&self) -> ReadyState {
        ReadyState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(ReadyState::Closed)
    }

    pub(crate) fn store_state(&self, state: ReadyState) {
        self.state.store(state.as_i8(), Ordering::Release);
    }

    pub(crate) fn request_close(&self) {
        self.close_requested.store(true, Ordering::Release);
        // notify_one keeps a permit when the read loop is not waiting yet.
        self.wake.notify_one();
    }

    pub(crate) fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    pub(crate) async fn close_signal(&self) {
        self.wake.notified().await;
    }
}

/// Non-owning reference to an `EventSource`.
///
/// Handles are cheap to clone and may be used from other tasks or from
/// inside listeners. Once the source is dropped, the handle reports
/// [`ReadyState::Closed`] and `close` does nothing.
#[derive(Clone)]
pub struct SourceHandle {
    id: Uuid,
    shared: Weak<Shared>,
}

impl SourceHandle {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            id: shared.id(),
            shared: Arc::downgrade(shared),
        }
    }

    /// Identifier of the source this handle points to.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.shared
            .upgrade()
            .map(|shared| shared.state())
            .unwrap_or(ReadyState::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.ready_state().is_closed()
    }

    /// Ask the source to close.
    ///
    /// The read loop observes the request before its next read or dispatch
    /// and abandons a read that is already in flight.
    pub fn close(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.request_close();
        }
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("id", &self.id)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl PartialEq for SourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SourceHandle {}
