//! Public typed API.
//!
//! # Responsibilities
//! - Typed verbs over the coordinator (GET/POST/PUT/PATCH/DELETE)
//! - Envelope decoding, or raw decoding for passthrough calls
//! - Clear the soft cache after every successful mutation
//!
//! # Design Decisions
//! - Payloads stay `serde_json::Value` until the call site asks for `T`
//! - Cache invalidation is global, never per key

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::{AuthResolver, FileStore, KeyValueStore, LoggingNavigator, MemoryStore, Navigator};
use crate::bypass::{BypassFlag, BypassMode};
use crate::cache::SoftCache;
use crate::client::coordinator::{Coordinator, InFlightRegistry};
use crate::client::envelope::ApiEnvelope;
use crate::client::error::{ApiError, ApiResult};
use crate::clock::{Clock, SystemClock};
use crate::config::{validate_config, ClientConfig, ConfigError, ValidationError};
use crate::resilience::retries::RetryPolicy;
use crate::telemetry::{TelemetryEmitter, TelemetrySink, TracingSink};
use crate::transport::{FormData, HttpTransport, Method, RequestBody, Transport};

/// Handle onto one configured request layer. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Coordinator>,
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    /// GET an enveloped response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        let value = self.send(Method::GET, path, RequestBody::Empty).await?;
        into_envelope(value)
    }

    /// GET through the soft cache under a caller-assembled key.
    ///
    /// Only successful envelopes are stored.
    pub async fn get_cached<T>(&self, cache_key: &str, path: &str, ttl_ms: i64) -> ApiResult<ApiEnvelope<T>>
    where
        T: DeserializeOwned + Serialize,
    {
        if let Some(hit) = self.inner.cache.get_as::<ApiEnvelope<T>>(cache_key) {
            tracing::trace!(cache_key, path, "Soft cache hit");
            return Ok(hit);
        }
        let envelope = self.get::<T>(path).await?;
        if envelope.success {
            self.inner.cache.set_as(cache_key, &envelope, ttl_ms);
        }
        Ok(envelope)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.send(Method::POST, path, encode(body)?).await?;
        into_envelope(value)
    }

    /// POST a multipart form. The transport sets the content type.
    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: FormData) -> ApiResult<ApiEnvelope<T>> {
        let value = self.send(Method::POST, path, RequestBody::Form(form)).await?;
        into_envelope(value)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.send(Method::PUT, path, encode(body)?).await?;
        into_envelope(value)
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.send(Method::PATCH, path, encode(body)?).await?;
        into_envelope(value)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        let value = self.send(Method::DELETE, path, RequestBody::Empty).await?;
        into_envelope(value)
    }

    /// GET without envelope validation.
    pub async fn raw_get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.send(Method::GET, path, RequestBody::Empty).await?;
        into_raw(value)
    }

    /// POST without envelope validation.
    pub async fn raw_post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.send(Method::POST, path, encode(body)?).await?;
        into_raw(value)
    }

    pub fn cache(&self) -> &SoftCache {
        &self.inner.cache
    }

    pub fn auth(&self) -> &AuthResolver {
        &self.inner.auth
    }

    pub fn telemetry(&self) -> &TelemetryEmitter {
        &self.inner.telemetry
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Number of deduplicated calls currently executing.
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    async fn send(&self, method: Method, path: &str, body: RequestBody) -> ApiResult<Value> {
        let mutating = method != Method::GET;
        let value = self.inner.issue(method, path, body).await?;
        if mutating {
            self.inner.cache.clear();
        }
        Ok(value)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("max_retries", &self.inner.retry.max_retries)
            .field("in_flight", &self.in_flight())
            .field("cache", &self.inner.cache)
            .finish()
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ApiResult<RequestBody> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::encode(&e))
}

fn into_envelope<T: DeserializeOwned>(value: Value) -> ApiResult<ApiEnvelope<T>> {
    ApiEnvelope::<T>::deserialize(&value).map_err(|e| ApiError::envelope(&e, value.clone()))
}

fn into_raw<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    T::deserialize(&value).map_err(|e| ApiError::envelope(&e, value.clone()))
}

/// Assembles an `ApiClient` from configuration and injected capabilities.
///
/// Anything not supplied gets a production default: `HttpTransport`,
/// `FileStore` (or `MemoryStore` without `auth.store_path`),
/// `LoggingNavigator`, `SystemClock`, an inactive `BypassFlag`, and a
/// `TracingSink`.
pub struct ApiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
    bypass: Option<Arc<dyn BypassMode>>,
    telemetry: Option<TelemetryEmitter>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl ApiClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            store: None,
            navigator: None,
            clock: None,
            bypass: None,
            telemetry: None,
            sink: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn bypass(mut self, bypass: Arc<dyn BypassMode>) -> Self {
        self.bypass = Some(bypass);
        self
    }

    /// Use an existing emitter instead of spawning one.
    pub fn telemetry(mut self, emitter: TelemetryEmitter) -> Self {
        self.telemetry = Some(emitter);
        self
    }

    /// Sink for the emitter spawned by `build`.
    pub fn telemetry_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and wire everything together.
    ///
    /// Spawns the telemetry flush task, so call it inside a Tokio runtime.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        let config = self.config;
        validate_config(&config).map_err(ConfigError::Validation)?;

        let base_url = config
            .resolved_base_url()
            .map(|url| url.trim().to_string())
            .ok_or_else(|| ConfigError::Validation(vec![ValidationError::MissingBaseUrl]))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&config.timeouts)?),
        };

        let store: Arc<dyn KeyValueStore> = match (self.store, &config.auth.store_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileStore::open(path)?),
            (None, None) => Arc::new(MemoryStore::new()),
        };

        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(LoggingNavigator) as Arc<dyn Navigator>);
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let bypass = self
            .bypass
            .unwrap_or_else(|| Arc::new(BypassFlag::default()) as Arc<dyn BypassMode>);

        let telemetry = match self.telemetry {
            Some(emitter) => emitter,
            None if !config.telemetry.enabled => TelemetryEmitter::disabled(),
            None => TelemetryEmitter::spawn(
                self.sink.unwrap_or_else(|| Arc::new(TracingSink) as Arc<dyn TelemetrySink>),
                config.telemetry.queue_capacity,
            ),
        };

        let coordinator = Coordinator {
            base_url,
            transport,
            auth: AuthResolver::new(store, navigator, &config.auth),
            cache: SoftCache::new(clock.clone(), bypass.clone()),
            retry: RetryPolicy::from_config(&config.retries),
            telemetry,
            clock,
            bypass,
            registry: Arc::new(InFlightRegistry::default()),
        };

        tracing::info!(
            base_url = %coordinator.base_url,
            max_retries = coordinator.retry.max_retries,
            backoff = ?coordinator.retry.backoff,
            "API client ready"
        );

        Ok(ApiClient {
            inner: Arc::new(coordinator),
        })
    }
}
