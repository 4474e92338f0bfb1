pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handle;
pub mod mock;
pub mod parser;
pub mod request;
pub mod source;
pub mod state;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::SourceConfig;
    pub use crate::dispatch::{Dispatcher, Listener, listener};
    pub use crate::error::{ErrorPayload, Result, SourceError};
    pub use crate::event::{MessageEvent, Propagation};
    pub use crate::handle::SourceHandle;
    pub use crate::parser::{ChunkParser, RawRecord, parse_record};
    pub use crate::request::{Method, StreamRequest};
    pub use crate::source::EventSource;
    pub use crate::state::ReadyState;
    pub use crate::transport::{ChunkReader, ReadResult, StreamReader, Transport, TransportResponse};
}
