//! Shared utilities for client integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crm_client::auth::{MemoryNavigator, MemoryStore};
use crm_client::bypass::BypassFlag;
use crm_client::clock::ManualClock;
use crm_client::config::ClientConfig;
use crm_client::telemetry::MemorySink;
use crm_client::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use crm_client::ApiClient;

pub const BASE_URL: &str = "http://crm.test/api";

/// One scripted reaction of the mock backend.
pub enum Reply {
    Respond(TransportResponse),
    Fail(TransportError),
    /// Never completes.
    Hang,
}

pub fn json(status: u16, body: Value) -> Reply {
    Reply::Respond(TransportResponse {
        status,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: serde_json::to_vec(&body).unwrap(),
    })
}

pub fn text(status: u16, body: &str) -> Reply {
    Reply::Respond(TransportResponse {
        status,
        content_type: Some("text/plain".to_string()),
        body: body.as_bytes().to_vec(),
    })
}

/// Transport that answers from a queue of replies and records every request.
///
/// Each response is delayed by a few scheduler turns so concurrent callers
/// reach the request layer before the first attempt settles.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        })
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: TransportRequest) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let reply = self.script.lock().unwrap().pop_front();

        async move {
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(err)) => Err(err),
                Some(Reply::Hang) => std::future::pending().await,
                None => Err(TransportError::Connect("script exhausted".into())),
            }
        }
        .boxed()
    }
}

/// A client wired to in-memory capabilities, plus handles onto each of them.
pub struct Harness {
    pub client: ApiClient,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub sink: Arc<MemorySink>,
    pub clock: Arc<ManualClock>,
    pub bypass: Arc<BypassFlag>,
}

pub fn config(max_retries: u32) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = Some(BASE_URL.to_string());
    config.retries.max_retries = max_retries;
    config
}

/// Must be called inside a Tokio runtime.
pub fn harness(config: ClientConfig, replies: impl IntoIterator<Item = Reply>) -> Harness {
    let transport = ScriptedTransport::new(replies);
    let store = Arc::new(MemoryStore::new());
    let navigator = Arc::new(MemoryNavigator::new("/leads"));
    let sink = Arc::new(MemorySink::new());
    let clock = Arc::new(ManualClock::new());
    let bypass = Arc::new(BypassFlag::default());

    let client = ApiClient::builder(config)
        .transport(transport.clone())
        .store(store.clone())
        .navigator(navigator.clone())
        .clock(clock.clone())
        .bypass(bypass.clone())
        .telemetry_sink(sink.clone())
        .build()
        .unwrap();

    Harness {
        client,
        transport,
        store,
        navigator,
        sink,
        clock,
        bypass,
    }
}
