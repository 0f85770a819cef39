//! Telemetry event records.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A transport attempt that succeeded.
    Ok,
    /// A transport attempt that failed.
    Failed,
    /// A decision to run another attempt.
    RetryAttempt,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Failed => "failed",
            Outcome::RetryAttempt => "retry_attempt",
        }
    }
}

/// One structured record per attempt or retry decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Shared by every event of one logical call.
    pub call_id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub endpoint: String,
    pub method: String,
    pub latency_ms: f64,
    pub outcome: Outcome,
    pub http_status: Option<u16>,
    pub retry_attempt: u32,
    pub request_bytes: usize,
    pub response_bytes: usize,
    pub message: Option<String>,
}

/// Milliseconds between two instants, rounded to two decimals.
pub fn latency_ms(start: Instant, end: Instant) -> f64 {
    let ms = end.saturating_duration_since(start).as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}

/// Byte length of the JSON text encoding of `value`, 0 if it cannot be encoded.
pub fn encoded_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|bytes| bytes.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use std::time::Duration;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("nope"))
        }
    }

    #[test]
    fn test_latency_rounding() {
        let start = Instant::now();
        let end = start + Duration::from_micros(12_346);
        assert_eq!(latency_ms(start, end), 12.35);
        assert_eq!(latency_ms(end, start), 0.0);
    }

    #[test]
    fn test_encoded_len() {
        assert_eq!(encoded_len(&serde_json::json!({"a": 1})), 7);
        assert_eq!(encoded_len("héllo"), 8);
        assert_eq!(encoded_len(&Unencodable), 0);
    }

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(serde_json::to_string(&Outcome::RetryAttempt).unwrap(), "\"retry_attempt\"");
        assert_eq!(Outcome::Ok.as_str(), "ok");
    }
}
