//! The single error shape surfaced to callers.

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// What went wrong, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response was obtained.
    Transport,
    /// A response with a non-2xx status other than 401.
    Http,
    /// A 401 response. The session is torn down on the first one of a call.
    Unauthorized,
    /// The response declared JSON but could not be parsed.
    Decode,
    /// The response did not match `{ success, data?, message? }`.
    Envelope,
    /// The envelope reported `success: false`.
    Rejected,
    /// The request body could not be serialized. No attempt was made.
    Encode,
}

/// Error returned by every client operation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub payload: Option<Value>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            payload: None,
        }
    }

    pub fn transport(err: &TransportError) -> Self {
        Self::new(ErrorKind::Transport, format!("Network request failed: {err}"))
    }

    /// Build the error for a non-2xx response.
    ///
    /// The message comes from the payload's `message` field when it has one.
    pub fn from_status(status: u16, payload: Value) -> Self {
        let kind = if status == 401 {
            ErrorKind::Unauthorized
        } else {
            ErrorKind::Http
        };
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed ({status})"));

        Self {
            kind,
            message,
            status: Some(status),
            payload: Some(payload),
        }
    }

    pub fn decode(status: u16, err: &serde_json::Error) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorKind::Decode, format!("Invalid JSON response: {err}"))
        }
    }

    pub fn envelope(err: &serde_json::Error, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(ErrorKind::Envelope, format!("Unexpected response shape: {err}"))
        }
    }

    pub fn encode(err: &serde_json::Error) -> Self {
        Self::new(ErrorKind::Encode, format!("Request body could not be encoded: {err}"))
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    /// Whether another attempt may help. Only a body that cannot be encoded
    /// is final; a 401 still spends the retry budget.
    pub fn is_retryable(&self) -> bool {
        self.kind != ErrorKind::Encode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_payload() {
        let err = ApiError::from_status(422, json!({"message": "Phone number is invalid"}));
        assert_eq!(err.kind, ErrorKind::Http);
        assert_eq!(err.status, Some(422));
        assert_eq!(err.to_string(), "Phone number is invalid");
    }

    #[test]
    fn test_generic_message() {
        let err = ApiError::from_status(503, json!("upstream down"));
        assert_eq!(err.message, "Request failed (503)");
        assert_eq!(err.payload, Some(json!("upstream down")));

        let err = ApiError::from_status(500, json!({"message": ""}));
        assert_eq!(err.message, "Request failed (500)");
    }

    #[test]
    fn test_retryable_kinds() {
        let err = ApiError::from_status(401, json!({}));
        assert!(err.is_unauthorized());
        assert!(err.is_retryable());
        assert!(!ApiError::new(ErrorKind::Encode, "bad body").is_retryable());
        assert!(ApiError::from_status(500, json!({})).is_retryable());
        assert!(ApiError::transport(&TransportError::Timeout).is_retryable());
    }
}
