use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::request::StreamRequest;

/// Outcome of one pull from a [`ChunkReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// Newly arrived text. Never repeats previously returned text.
    Chunk(String),
    /// The stream has ended; no further chunks follow.
    Done,
}

/// Pull-based reader over a decoded response body.
#[async_trait]
pub trait ChunkReader: Send {
    async fn read(&mut self) -> Result<ReadResult>;
}

/// Response to a stream request.
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    /// `None` when the response carries no readable body.
    pub body: Option<Box<dyn ChunkReader>>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Establishes streaming requests.
///
/// Implementations own the underlying connection; dropping the returned
/// reader must release it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: &StreamRequest) -> Result<TransportResponse>;
}

/// Adapts a stream of text chunks into a [`ChunkReader`].
pub struct StreamReader {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl StreamReader {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<String>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

#[async_trait]
impl ChunkReader for StreamReader {
    async fn read(&mut self) -> Result<ReadResult> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(ReadResult::Chunk(chunk)),
            Some(Err(e)) => Err(e),
            None => Ok(ReadResult::Done),
        }
    }
}
