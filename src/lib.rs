//! Shared HTTP request layer for the CRM backend.
//!
//! Every domain service call goes through [`ApiClient`], which deduplicates
//! concurrent identical requests, retries failures within a configured
//! budget, keeps a short-lived response cache, resolves and invalidates
//! credentials, and reports each attempt to telemetry.

pub mod auth;
pub mod bypass;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod telemetry;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder, ApiEnvelope, ApiError, ApiResult, ErrorKind};
pub use config::ClientConfig;
