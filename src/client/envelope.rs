//! The `{ success, data?, message? }` wire contract.

use serde::{Deserialize, Serialize};

use crate::client::error::{ApiError, ApiResult, ErrorKind};

/// Envelope wrapping most backend responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Treat `success: false` as an error and unwrap the payload.
    pub fn into_data(self) -> ApiResult<T> {
        if !self.success {
            let message = self
                .message
                .unwrap_or_else(|| "Request was not successful".to_string());
            return Err(ApiError::new(ErrorKind::Rejected, message));
        }
        self.data
            .ok_or_else(|| ApiError::new(ErrorKind::Envelope, "Response envelope carried no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields() {
        let envelope: ApiEnvelope<Vec<String>> =
            serde_json::from_value(json!({"success": true})).unwrap();
        assert!(envelope.data.is_none());
        assert!(envelope.message.is_none());

        let missing_flag = serde_json::from_value::<ApiEnvelope<u32>>(json!({"data": 1}));
        assert!(missing_flag.is_err());
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Booking {
        slot: String,
    }

    fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> ApiEnvelope<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_payload_without_default() {
        let envelope: ApiEnvelope<Booking> = decode(json!({"success": true}));
        assert!(envelope.data.is_none());

        let envelope: ApiEnvelope<Booking> =
            decode(json!({"success": true, "data": {"slot": "09:00"}}));
        assert_eq!(envelope.data.unwrap().slot, "09:00");
    }

    #[test]
    fn test_into_data() {
        let ok = ApiEnvelope {
            success: true,
            data: Some(7),
            message: None,
        };
        assert_eq!(ok.into_data().unwrap(), 7);

        let rejected: ApiEnvelope<u32> = ApiEnvelope {
            success: false,
            data: None,
            message: Some("Slot already booked".into()),
        };
        let err = rejected.into_data().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Rejected);
        assert_eq!(err.message, "Slot already booked");
    }
}
