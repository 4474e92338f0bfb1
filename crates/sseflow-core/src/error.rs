use serde::Serialize;
use thiserror::Error;

/// Errors raised while establishing or reading an event stream.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Response has no readable body")]
    MissingBody,

    /// Any failure raised while issuing the request or reading the body.
    #[error("Stream failure: {0}")]
    Stream(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SourceError {
    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { .. } => "transport",
            Self::MissingBody => "missing_body",
            Self::Stream(_) => "stream_failure",
            Self::Serialization(_) => "serialization",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build the payload carried as `data` by `error` events.
    pub fn payload(&self) -> ErrorPayload {
        let (status, status_text) = match self {
            Self::Status {
                status,
                status_text,
            } => (Some(*status), Some(status_text.clone())),
            _ => (None, None),
        };
        ErrorPayload {
            message: self.to_string(),
            code: self.code().to_string(),
            status,
            status_text,
        }
    }
}

/// Serializable description of a failure, delivered with `error` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
}

pub type Result<T> = std::result::Result<T, SourceError>;
