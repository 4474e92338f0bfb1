use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, SourceError};
use crate::request::StreamRequest;
use crate::transport::{ChunkReader, ReadResult, Transport, TransportResponse};

/// One scripted outcome of a body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    Chunk(String),
    /// Fail the read with `SourceError::Stream`.
    Error(String),
    /// Never complete; used to exercise closing during a read.
    Hang,
}

/// A Transport that replays a preset response and records requests.
#[derive(Debug, Clone)]
pub struct MockTransport {
    status: u16,
    status_text: String,
    body: Option<Vec<MockRead>>,
    open_error: Option<String>,
    requests: Arc<Mutex<Vec<StreamRequest>>>,
}

impl MockTransport {
    /// A `200 OK` response whose body yields `chunks`, then ends.
    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self::with_reads(
            chunks
                .iter()
                .map(|c| MockRead::Chunk((*c).to_string()))
                .collect(),
        )
    }

    /// A `200 OK` response replaying `reads` in order, then ending.
    pub fn with_reads(reads: Vec<MockRead>) -> Self {
        Self {
            status: 200,
            status_text: "OK".into(),
            body: Some(reads),
            open_error: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transport whose `open` fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::with_reads(Vec::new())
        }
    }

    pub fn status(mut self, status: u16, status_text: impl Into<String>) -> Self {
        self.status = status;
        self.status_text = status_text.into();
        self
    }

    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Requests issued through this transport, shared with its clones.
    pub fn requests(&self) -> Arc<Mutex<Vec<StreamRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, request: &StreamRequest) -> Result<TransportResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(message) = &self.open_error {
            return Err(SourceError::Stream(message.clone()));
        }
        let body = self.body.clone().map(|reads| {
            Box::new(MockReader {
                reads: reads.into(),
            }) as Box<dyn ChunkReader>
        });
        Ok(TransportResponse {
            status: self.status,
            status_text: self.status_text.clone(),
            body,
        })
    }
}

struct MockReader {
    reads: VecDeque<MockRead>,
}

#[async_trait]
impl ChunkReader for MockReader {
    async fn read(&mut self) -> Result<ReadResult> {
        match self.reads.pop_front() {
            Some(MockRead::Chunk(chunk)) => Ok(ReadResult::Chunk(chunk)),
            Some(MockRead::Error(message)) => Err(SourceError::Stream(message)),
            Some(MockRead::Hang) => futures::future::pending().await,
            None => Ok(ReadResult::Done),
        }
    }
}
