//! Telemetry sinks.

use std::sync::Mutex;

use thiserror::Error;

use crate::telemetry::event::{Outcome, TelemetryEvent};

/// Errors a sink may report. They are counted, never propagated to callers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for telemetry events.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Writes every event as a structured `tracing` record under target `telemetry`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        tracing::info!(
            target: "telemetry",
            call_id = %event.call_id,
            timestamp_ms = event.timestamp_ms,
            endpoint = %event.endpoint,
            method = %event.method,
            outcome = event.outcome.as_str(),
            http_status = ?event.http_status,
            latency_ms = event.latency_ms,
            retry_attempt = event.retry_attempt,
            request_bytes = event.request_bytes,
            response_bytes = event.response_bytes,
            message = ?event.message,
            "api attempt"
        );
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().expect("telemetry sink mutex poisoned").clone()
    }

    /// Number of recorded events with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.events
            .lock()
            .expect("telemetry sink mutex poisoned")
            .iter()
            .filter(|event| event.outcome == outcome)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("telemetry sink mutex poisoned").clear();
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        self.events
            .lock()
            .map_err(|_| TelemetryError::Unavailable("memory sink poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}
