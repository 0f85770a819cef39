//! Non-blocking telemetry emitter.
//!
//! # Responsibilities
//! - Accept events without ever suspending or failing the caller
//! - Deliver them to a sink from a background task
//! - Count what was lost (queue full, task gone, sink errors)
//!
//! # Design Decisions
//! - Bounded Tokio mpsc queue; `try_send` only on the hot path
//! - `flush()` rides the same queue, so an ack means every earlier event
//!   has been handed to the sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::observability::metrics;
use crate::telemetry::event::TelemetryEvent;
use crate::telemetry::sink::TelemetrySink;

enum Command {
    Record(TelemetryEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct EmitterStats {
    dropped: AtomicU64,
    sink_failures: AtomicU64,
}

/// Cheap-to-clone handle onto the telemetry queue.
#[derive(Clone)]
pub struct TelemetryEmitter {
    tx: Option<mpsc::Sender<Command>>,
    stats: Arc<EmitterStats>,
}

impl TelemetryEmitter {
    /// Start the background flush task on the current Tokio runtime.
    ///
    /// Outside a runtime the emitter comes up disabled.
    pub fn spawn(sink: Arc<dyn TelemetrySink>, capacity: usize) -> Self {
        let stats = Arc::new(EmitterStats::default());

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No Tokio runtime available, telemetry disabled");
                return Self { tx: None, stats };
            }
        };

        let (tx, rx) = mpsc::channel(capacity.max(1));
        handle.spawn(run_flush_loop(rx, sink, stats.clone()));

        Self { tx: Some(tx), stats }
    }

    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            stats: Arc::new(EmitterStats::default()),
        }
    }

    /// Queue an event. Never blocks, never fails.
    pub fn emit(&self, event: TelemetryEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        let reason = match tx.try_send(Command::Record(event)) {
            Ok(()) => return,
            Err(TrySendError::Full(_)) => "queue_full",
            Err(TrySendError::Closed(_)) => "closed",
        };

        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::record_telemetry_dropped(reason);
        tracing::debug!(reason, "Telemetry event dropped");
    }

    /// Wait until every event queued before this call reached the sink.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack, done) = oneshot::channel();
        if tx.send(Command::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Events that never made it into the queue.
    pub fn dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Events the sink rejected.
    pub fn sink_failures(&self) -> u64 {
        self.stats.sink_failures.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }
}

impl std::fmt::Debug for TelemetryEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryEmitter")
            .field("enabled", &self.is_enabled())
            .field("dropped", &self.dropped())
            .field("sink_failures", &self.sink_failures())
            .finish()
    }
}

async fn run_flush_loop(
    mut rx: mpsc::Receiver<Command>,
    sink: Arc<dyn TelemetrySink>,
    stats: Arc<EmitterStats>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(event) => {
                if let Err(e) = sink.record(&event) {
                    stats.sink_failures.fetch_add(1, Ordering::Relaxed);
                    metrics::record_telemetry_dropped("sink_error");
                    tracing::debug!(error = %e, "Telemetry sink rejected event");
                }
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Telemetry flush loop stopped");
}
