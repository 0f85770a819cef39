//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Per-attempt request telemetry is a separate channel, see `crate::telemetry`.
//! ```

pub mod logging;
pub mod metrics;
