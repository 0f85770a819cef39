//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend location.
    pub api: ApiConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Credential slots and session guard settings.
    pub auth: AuthConfig,

    /// Telemetry side channel settings.
    pub telemetry: TelemetryConfig,

    /// Transport timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Primary base URL if set and non-empty, else the fallback.
    pub fn resolved_base_url(&self) -> Option<&str> {
        self.api
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                self.api
                    .base_url_fallback
                    .as_deref()
                    .filter(|url| !url.trim().is_empty())
            })
    }
}

/// Backend location.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefixed onto every request path (`API_BASE_URL`).
    pub base_url: Option<String>,

    /// Used when `base_url` is unset (`API_BASE_URL_FALLBACK`).
    pub base_url_fallback: Option<String>,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries per logical call after the first attempt (`API_MAX_RETRIES`).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds. 0 disables backoff.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 2000,
        }
    }
}

/// Credential storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Slot names checked in order, durable scope first, then session scope.
    pub token_slots: Vec<String>,

    /// Cached current-user record cleared on forced logout.
    pub session_record_slot: String,

    /// Login entry point for redirects.
    pub login_path: String,

    /// JSON file backing the durable scope. In-memory when unset.
    pub store_path: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_slots: vec![
                "crm_token".to_string(),
                "authToken".to_string(),
                "token".to_string(),
            ],
            session_record_slot: "crm_current_user".to_string(),
            login_path: "/login".to_string(),
            store_path: None,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Emit telemetry events at all.
    pub enabled: bool,

    /// Bounded queue size; events beyond it are dropped and counted.
    pub queue_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_capacity: 1024,
        }
    }
}

/// Timeout configuration for the HTTP transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://crm.example.com/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.retries.max_retries, 0);
        assert_eq!(config.auth.login_path, "/login");
        assert_eq!(config.telemetry.queue_capacity, 1024);
        assert_eq!(config.resolved_base_url(), Some("https://crm.example.com/api"));
    }

    #[test]
    fn test_fallback_base_url() {
        let mut config = ClientConfig::default();
        assert_eq!(config.resolved_base_url(), None);

        config.api.base_url_fallback = Some("http://localhost:4000".into());
        assert_eq!(config.resolved_base_url(), Some("http://localhost:4000"));

        config.api.base_url = Some("  ".into());
        assert_eq!(config.resolved_base_url(), Some("http://localhost:4000"));

        config.api.base_url = Some("https://primary".into());
        assert_eq!(config.resolved_base_url(), Some("https://primary"));
    }
}
