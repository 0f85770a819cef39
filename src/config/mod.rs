//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → API_* environment overrides
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to ApiClient::builder
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a client is built from it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    ApiConfig, AuthConfig, ClientConfig, ObservabilityConfig, RetryConfig, TelemetryConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
