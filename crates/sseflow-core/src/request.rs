use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::error::Result;

pub const EVENT_STREAM: &str = "text/event-stream";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a transport needs to open a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub url: String,
    pub method: Method,
    /// Header names are stored in canonical casing.
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub with_credentials: bool,
}

impl StreamRequest {
    /// A GET request with `Content-Type: text/event-stream` by default.
    pub fn get(url: impl Into<String>, config: &SourceConfig) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: merge_headers(&[("Content-Type", EVENT_STREAM)], &config.headers),
            body: None,
            with_credentials: config.with_credentials,
        }
    }

    /// A POST request carrying `body` serialized as JSON.
    pub fn post<B>(url: impl Into<String>, body: &B, config: &SourceConfig) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_string(body)?;
        Ok(Self {
            url: url.into(),
            method: Method::Post,
            headers: merge_headers(&[("Content-Type", APPLICATION_JSON)], &config.headers),
            body: Some(body),
            with_credentials: config.with_credentials,
        })
    }

    /// Look up a header by name, in any casing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&normalize_header_name(name))
            .map(String::as_str)
    }
}

/// Canonical header casing: each dash-separated word capitalized
/// (`x-request-id` becomes `X-Request-Id`).
pub fn normalize_header_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

fn merge_headers(
    defaults: &[(&str, &str)],
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = defaults
        .iter()
        .map(|(name, value)| (normalize_header_name(name), (*value).to_string()))
        .collect();
    for (name, value) in overrides {
        headers.insert(normalize_header_name(name), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_names() {
        assert_eq!(normalize_header_name("content-type"), "Content-Type");
        assert_eq!(normalize_header_name("CONTENT-TYPE"), "Content-Type");
        assert_eq!(normalize_header_name("x-request-id"), "X-Request-Id");
        assert_eq!(normalize_header_name(" authorization "), "Authorization");
        assert_eq!(normalize_header_name("etag"), "Etag");
    }

    #[test]
    fn get_sets_event_stream_content_type() {
        let req = StreamRequest::get("http://localhost/events", &SourceConfig::default());
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.header("content-type"), Some(EVENT_STREAM));
        assert!(req.body.is_none());
        assert!(!req.with_credentials);
    }

    #[test]
    fn post_serializes_body_as_json() {
        let body = serde_json::json!({"query": "hi"});
        let req = StreamRequest::post("http://localhost/chat", &body, &SourceConfig::default())
            .unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header("Content-Type"), Some(APPLICATION_JSON));
        assert_eq!(req.body.as_deref(), Some(r#"{"query":"hi"}"#));
    }

    #[test]
    fn caller_headers_override_defaults() {
        let config = SourceConfig::new()
            .with_header("content-type", "text/plain")
            .with_header("authorization", "Bearer abc")
            .with_credentials(true);
        let req = StreamRequest::get("http://localhost/events", &config);
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.headers["Content-Type"], "text/plain");
        assert_eq!(req.headers["Authorization"], "Bearer abc");
        assert!(req.with_credentials);
    }

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(serde_json::to_string(&Method::Post).unwrap(), "\"POST\"");
    }
}
