//! Request coordination: deduplication and per-attempt execution.
//!
//! # Responsibilities
//! - Collapse concurrent identical calls onto one attempt sequence
//! - Build each transport request (URL, headers, body)
//! - Decode responses and map non-2xx statuses to `ApiError`
//! - Tear the session down on the first 401 a call observes
//!
//! # Design Decisions
//! - The registry holds weak handles; the call's own future owns the
//!   registration guard, so the entry goes away when the call settles or
//!   every caller has given up on it
//! - Registrations carry a generation so a settling call never removes a
//!   newer call under the same key

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared, WeakShared};
use futures_util::FutureExt;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthResolver;
use crate::bypass::BypassMode;
use crate::cache::SoftCache;
use crate::client::error::{ApiError, ApiResult};
use crate::clock::Clock;
use crate::observability::metrics;
use crate::resilience::retries::{AttemptReport, CallInfo, RetryPolicy};
use crate::telemetry::TelemetryEmitter;
use crate::transport::{
    Method, RequestBody, Transport, TransportRequest, TransportResponse, JSON_CONTENT_TYPE,
};

type CallFuture = BoxFuture<'static, ApiResult<Value>>;
type SharedCall = Shared<CallFuture>;

/// Identifies a logical call for deduplication. Not a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    path: String,
    token_fingerprint: Option<u64>,
    body: String,
}

impl RequestKey {
    pub fn new(method: &Method, path: &str, token: Option<&str>, body: &RequestBody) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: path.to_string(),
            token_fingerprint: token.map(|token| {
                let mut hasher = DefaultHasher::new();
                token.hash(&mut hasher);
                hasher.finish()
            }),
            body: body.fingerprint(),
        }
    }
}

struct InFlight {
    generation: u64,
    call: WeakShared<CallFuture>,
}

/// Calls currently executing, by key.
#[derive(Default)]
pub struct InFlightRegistry {
    calls: DashMap<RequestKey, InFlight>,
    next_generation: AtomicU64,
}

impl InFlightRegistry {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Deregisters a call when its future completes or is dropped.
struct Registration {
    registry: Arc<InFlightRegistry>,
    key: RequestKey,
    generation: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let generation = self.generation;
        self.registry
            .calls
            .remove_if(&self.key, |_, entry| entry.generation == generation);
    }
}

/// One logical call as handed to the executor.
struct Call {
    id: Uuid,
    method: Method,
    path: String,
    body: RequestBody,
    token: Option<String>,
}

/// Owns every piece of shared state the request layer needs.
pub struct Coordinator {
    pub(crate) base_url: String,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) auth: AuthResolver,
    pub(crate) cache: SoftCache,
    pub(crate) retry: RetryPolicy,
    pub(crate) telemetry: TelemetryEmitter,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) bypass: Arc<dyn BypassMode>,
    pub(crate) registry: Arc<InFlightRegistry>,
}

impl Coordinator {
    /// Issue a call, sharing an identical in-flight one when possible.
    pub async fn issue(self: &Arc<Self>, method: Method, path: &str, body: RequestBody) -> ApiResult<Value> {
        let call = Call {
            id: Uuid::new_v4(),
            method,
            path: path.to_string(),
            body,
            token: self.auth.resolve_token(),
        };

        if self.bypass.is_active() {
            return self.execute(call).await;
        }

        let key = RequestKey::new(&call.method, &call.path, call.token.as_deref(), &call.body);
        self.attach_or_start(key, call).await
    }

    fn attach_or_start(self: &Arc<Self>, key: RequestKey, call: Call) -> SharedCall {
        match self.registry.calls.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().call.upgrade() {
                    tracing::debug!(
                        method = %call.method,
                        path = %call.path,
                        "Attaching to in-flight request"
                    );
                    metrics::record_dedup_hit();
                    return existing;
                }
                let (in_flight, shared) = self.start(entry.key().clone(), call);
                if let Some(in_flight) = in_flight {
                    entry.insert(in_flight);
                }
                shared
            }
            Entry::Vacant(entry) => {
                let (in_flight, shared) = self.start(entry.key().clone(), call);
                if let Some(in_flight) = in_flight {
                    entry.insert(in_flight);
                }
                shared
            }
        }
    }

    fn start(self: &Arc<Self>, key: RequestKey, call: Call) -> (Option<InFlight>, SharedCall) {
        let generation = self.registry.next_generation.fetch_add(1, Ordering::Relaxed);
        let registration = Registration {
            registry: Arc::clone(&self.registry),
            key,
            generation,
        };

        let this = Arc::clone(self);
        let shared = async move {
            let _registration = registration;
            this.execute(call).await
        }
        .boxed()
        .shared();

        let in_flight = shared
            .downgrade()
            .map(|call| InFlight { generation, call });
        (in_flight, shared)
    }

    async fn execute(&self, call: Call) -> ApiResult<Value> {
        let request = TransportRequest {
            method: call.method.clone(),
            url: join_url(&self.base_url, &call.path),
            headers: request_headers(call.token.as_deref(), &call.body),
            body: call.body,
        };
        let info = CallInfo {
            call_id: call.id,
            endpoint: call.path,
            method: call.method.to_string(),
            request_bytes: request.body.telemetry_bytes(),
        };

        let session_torn_down = AtomicBool::new(false);
        self.retry
            .run(&info, &self.telemetry, self.clock.as_ref(), |_| {
                self.attempt_once(request.clone(), &session_torn_down)
            })
            .await
    }

    async fn attempt_once(
        &self,
        request: TransportRequest,
        session_torn_down: &AtomicBool,
    ) -> AttemptReport<Value> {
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                return AttemptReport {
                    result: Err(ApiError::transport(&e)),
                    status: None,
                    response_bytes: 0,
                }
            }
        };

        let status = response.status;
        let response_bytes = response.body.len();
        let result = if response.is_success() {
            decode_body(&response).map_err(|e| ApiError::decode(status, &e))
        } else {
            let payload = decode_body(&response)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&response.body).into_owned()));
            if status == 401 && !session_torn_down.swap(true, Ordering::Relaxed) {
                self.auth.handle_unauthorized();
                self.cache.clear();
            }
            Err(ApiError::from_status(status, payload))
        };

        AttemptReport {
            result,
            status: Some(status),
            response_bytes,
        }
    }
}

/// JSON when the response says so, otherwise the body as a JSON string.
fn decode_body(response: &TransportResponse) -> Result<Value, serde_json::Error> {
    if !response.is_json() {
        return Ok(Value::String(String::from_utf8_lossy(&response.body).into_owned()));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body)
}

fn request_headers(token: Option<&str>, body: &RequestBody) -> Vec<(String, String)> {
    let mut headers = vec![("Accept".to_string(), JSON_CONTENT_TYPE.to_string())];
    if let Some(token) = token {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }
    if let Some(content_type) = body.content_type() {
        headers.push(("Content-Type".to_string(), content_type.to_string()));
    }
    headers
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::FormData;
    use serde_json::json;

    #[test]
    fn test_request_key_components() {
        let body = RequestBody::Json(json!({"status": "new"}));
        let a = RequestKey::new(&Method::POST, "/leads", Some("t1"), &body);

        assert_eq!(a, RequestKey::new(&Method::POST, "/leads", Some("t1"), &body.clone()));
        assert_ne!(a, RequestKey::new(&Method::PUT, "/leads", Some("t1"), &body));
        assert_ne!(a, RequestKey::new(&Method::POST, "/leads/1", Some("t1"), &body));
        assert_ne!(a, RequestKey::new(&Method::POST, "/leads", Some("t2"), &body));
        assert_ne!(a, RequestKey::new(&Method::POST, "/leads", None, &body));
        assert_ne!(a, RequestKey::new(&Method::POST, "/leads", Some("t1"), &RequestBody::Empty));
    }

    #[test]
    fn test_request_key_does_not_hold_token() {
        let key = RequestKey::new(&Method::GET, "/me", Some("secret-token"), &RequestBody::Empty);
        assert!(!format!("{key:?}").contains("secret-token"));
    }

    #[test]
    fn test_headers() {
        let headers = request_headers(Some("abc"), &RequestBody::Json(json!({})));
        assert_eq!(
            headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Bearer abc".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ]
        );

        let headers = request_headers(None, &RequestBody::Form(FormData::new().text("a", "b")));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://crm.test/api/", "/leads"), "https://crm.test/api/leads");
        assert_eq!(join_url("https://crm.test/api", "leads"), "https://crm.test/api/leads");
    }

    #[test]
    fn test_decode_body() {
        let response = |content_type: Option<&str>, body: &str| TransportResponse {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.as_bytes().to_vec(),
        };

        assert_eq!(
            decode_body(&response(Some("application/json"), r#"{"success":true}"#)).unwrap(),
            json!({"success": true})
        );
        assert_eq!(decode_body(&response(Some("application/json"), "")).unwrap(), Value::Null);
        assert_eq!(decode_body(&response(Some("text/plain"), "pong")).unwrap(), json!("pong"));
        assert!(decode_body(&response(Some("application/json"), "<html>")).is_err());
    }
}
