//! Request layer client.
//!
//! # Data Flow
//! ```text
//! caller
//!     → api.rs (typed verb, body encoding)
//!     → coordinator.rs (dedup key; attach to in-flight call or start one)
//!     → resilience::retries (bounded attempt loop, telemetry per attempt)
//!     → transport (one network round trip)
//!     ← coordinator.rs (decode, status → ApiError, 401 → session teardown)
//!     ← api.rs (envelope decode, cache clear on successful mutation)
//! ```

pub mod api;
pub mod coordinator;
pub mod envelope;
pub mod error;

pub use api::{ApiClient, ApiClientBuilder};
pub use coordinator::RequestKey;
pub use envelope::ApiEnvelope;
pub use error::{ApiError, ApiResult, ErrorKind};
