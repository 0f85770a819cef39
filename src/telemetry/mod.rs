//! Per-attempt request telemetry.
//!
//! # Data Flow
//! ```text
//! retry engine (one event per attempt, one per retry decision)
//!     → emitter.rs (bounded queue, try_send)
//!     → background flush task
//!     → sink.rs (tracing, memory, or caller-supplied)
//! ```
//!
//! # Design Decisions
//! - Telemetry never alters the outcome of the request it describes
//! - Loss is counted, not hidden

pub mod emitter;
pub mod event;
pub mod sink;

pub use emitter::TelemetryEmitter;
pub use event::{encoded_len, latency_ms, Outcome, TelemetryEvent};
pub use sink::{MemorySink, TelemetryError, TelemetrySink, TracingSink};
