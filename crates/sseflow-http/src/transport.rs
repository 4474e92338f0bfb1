//! reqwest-backed [`Transport`].

use async_trait::async_trait;

use sseflow_core::config::SourceConfig;
use sseflow_core::error::{Result, SourceError};
use sseflow_core::request::{Method, StreamRequest};
use sseflow_core::transport::{Transport, TransportResponse};

use crate::reader::body_reader;

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Reuse an existing client and its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client honouring the config's connect timeout.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SourceError::Stream(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: &StreamRequest) -> Result<TransportResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Stream(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), url = %request.url, "http stream opened");

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: Some(Box::new(body_reader(response))),
        })
    }
}
