//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::transport::TransportError;

pub const ENV_BASE_URL: &str = "API_BASE_URL";
pub const ENV_BASE_URL_FALLBACK: &str = "API_BASE_URL_FALLBACK";
pub const ENV_MAX_RETRIES: &str = "API_MAX_RETRIES";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}' (expected a non-negative integer)")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, and validate.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        base_url = ?config.resolved_base_url(),
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse and apply environment overrides without validating, for callers
/// that adjust the result before building a client.
pub fn read_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ClientConfig::default(),
    };
    apply_overrides(config, |var| std::env::var(var).ok())
}

/// Apply `API_*` overrides read through `lookup`.
pub fn apply_overrides<F>(mut config: ClientConfig, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BASE_URL) {
        config.api.base_url = Some(url);
    }
    if let Some(url) = lookup(ENV_BASE_URL_FALLBACK) {
        config.api.base_url_fallback = Some(url);
    }
    if let Some(raw) = lookup(ENV_MAX_RETRIES) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.retries.max_retries = trimmed.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MAX_RETRIES,
                value: raw.clone(),
            })?;
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_overrides(
            ClientConfig::default(),
            env(&[
                ("API_BASE_URL", "https://crm.example.com"),
                ("API_MAX_RETRIES", "3"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_url.as_deref(), Some("https://crm.example.com"));
        assert_eq!(config.retries.max_retries, 3);
    }

    #[test]
    fn test_invalid_retry_env() {
        let err = apply_overrides(ClientConfig::default(), env(&[("API_MAX_RETRIES", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "API_MAX_RETRIES", .. }));
    }

    #[test]
    fn test_blank_retry_env_keeps_default() {
        let config =
            apply_overrides(ClientConfig::default(), env(&[("API_MAX_RETRIES", " ")])).unwrap();
        assert_eq!(config.retries.max_retries, 0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[api]\nbase_url_fallback = \"http://localhost:4000/api\"\n\n[auth]\nlogin_path = \"/signin\""
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.auth.login_path, "/signin");
        assert!(config.resolved_base_url().is_some());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retries]\nmax_retries = \"many\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation(vec![
            ValidationError::MissingBaseUrl,
            ValidationError::ZeroQueueCapacity,
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Validation failed: "));
        assert!(text.contains(", telemetry.queue_capacity"));
    }
}
