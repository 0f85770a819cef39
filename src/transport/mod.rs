//! Transport capability.
//!
//! # Responsibilities
//! - Define the one suspension point of the request layer: send a request,
//!   read the full response body
//! - Describe request bodies (JSON or multipart) independent of any HTTP crate
//!
//! # Design Decisions
//! - Object-safe trait returning a boxed future so tests can swap it out
//! - Transports never interpret status codes; that is the coordinator's job
//! - No timeout of the layer's own; the transport's timeout bounds an attempt

pub mod http;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use futures_util::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::telemetry::encoded_len;

pub use self::http::HttpTransport;
pub use reqwest::Method;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A request body as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// Serialized as JSON text with a JSON content type.
    Json(Value),
    /// Passed through; the transport sets the multipart content type.
    Form(FormData),
}

impl RequestBody {
    /// Stable text form used in dedup keys.
    pub fn fingerprint(&self) -> String {
        match self {
            RequestBody::Empty => String::new(),
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Form(form) => format!("form:{:016x}", form.digest()),
        }
    }

    /// Approximate request payload size reported in telemetry.
    pub fn telemetry_bytes(&self) -> usize {
        match self {
            RequestBody::Json(value) => encoded_len(value),
            RequestBody::Empty | RequestBody::Form(_) => 0,
        }
    }

    /// Content type this layer sets, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Json(_) => Some(JSON_CONTENT_TYPE),
            RequestBody::Empty | RequestBody::Form(_) => None,
        }
    }
}

/// Multipart form body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FormData {
    parts: Vec<FormPart>,
}

/// One field of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(str::to_string),
            bytes,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A fully built request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response with its body fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the declared content type is JSON (`application/json` or `*+json`).
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                essence == JSON_CONTENT_TYPE || essence.ends_with("+json")
            })
            .unwrap_or(false)
    }
}

/// The network call could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request could not be sent: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends one request and reads the whole response.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest)
        -> BoxFuture<'_, Result<TransportResponse, TransportError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_content_type_detection() {
        let mut response = TransportResponse {
            status: 200,
            content_type: Some("application/json; charset=utf-8".into()),
            body: Vec::new(),
        };
        assert!(response.is_json());

        response.content_type = Some("application/problem+json".into());
        assert!(response.is_json());

        response.content_type = Some("text/html".into());
        assert!(!response.is_json());

        response.content_type = None;
        assert!(!response.is_json());
    }

    #[test]
    fn test_body_metadata() {
        let body = RequestBody::Json(json!({"name": "Ada"}));
        assert_eq!(body.content_type(), Some(JSON_CONTENT_TYPE));
        assert_eq!(body.telemetry_bytes(), 14);
        assert_eq!(body.fingerprint(), r#"{"name":"Ada"}"#);

        let form = RequestBody::Form(FormData::new().file("doc", "a.pdf", None, vec![1, 2, 3]));
        assert_eq!(form.content_type(), None);
        assert_eq!(form.telemetry_bytes(), 0);
    }

    #[test]
    fn test_form_fingerprints_differ_by_content() {
        let a = RequestBody::Form(FormData::new().text("note", "first"));
        let b = RequestBody::Form(FormData::new().text("note", "second"));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }
}
