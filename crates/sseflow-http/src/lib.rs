//! HTTP entry points for sseflow.
//!
//! ```no_run
//! # async fn demo() -> sseflow_core::error::Result<()> {
//! use sseflow_core::config::SourceConfig;
//!
//! let (handle, task) = sseflow_http::connect_get(
//!     "http://localhost:3000/events",
//!     SourceConfig::new(),
//!     |source| {
//!         source.on("greet", |event| println!("{}", event.data));
//!     },
//! )?;
//! # handle.close();
//! # let _ = task.await;
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod reader;
pub mod transport;

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use sseflow_core::config::SourceConfig;
use sseflow_core::error::Result;
use sseflow_core::handle::SourceHandle;
use sseflow_core::request::StreamRequest;
use sseflow_core::source::EventSource;

use crate::transport::HttpTransport;

/// Build a GET event source. Nothing is sent until it is run or spawned.
pub fn get(url: impl Into<String>, config: SourceConfig) -> Result<EventSource> {
    let transport = HttpTransport::from_config(&config)?;
    let request = StreamRequest::get(url, &config);
    Ok(EventSource::new(request, Arc::new(transport)))
}

/// Build a POST event source with `body` serialized as JSON.
pub fn post<B>(url: impl Into<String>, body: &B, config: SourceConfig) -> Result<EventSource>
where
    B: Serialize + ?Sized,
{
    let transport = HttpTransport::from_config(&config)?;
    let request = StreamRequest::post(url, body, &config)?;
    Ok(EventSource::new(request, Arc::new(transport)))
}

/// Build a GET source, let `setup` register listeners, and start it.
///
/// Must be called from within a tokio runtime.
pub fn connect_get<F>(
    url: impl Into<String>,
    config: SourceConfig,
    setup: F,
) -> Result<(SourceHandle, JoinHandle<()>)>
where
    F: FnOnce(&mut EventSource),
{
    let mut source = get(url, config)?;
    setup(&mut source);
    Ok(source.spawn())
}

/// POST counterpart of [`connect_get`].
pub fn connect_post<B, F>(
    url: impl Into<String>,
    body: &B,
    config: SourceConfig,
    setup: F,
) -> Result<(SourceHandle, JoinHandle<()>)>
where
    B: Serialize + ?Sized,
    F: FnOnce(&mut EventSource),
{
    let mut source = post(url, body, config)?;
    setup(&mut source);
    Ok(source.spawn())
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::transport::HttpTransport;
    pub use crate::{connect_get, connect_post, get, post};
    pub use sseflow_core::prelude::*;
}
