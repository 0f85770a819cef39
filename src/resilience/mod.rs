//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! logical call
//!     → retries.rs (attempt loop, retry decision, telemetry per attempt)
//!     → backoff.rs (delay before the next attempt, none by default)
//! ```

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::{AttemptReport, CallInfo, RetryPolicy};
