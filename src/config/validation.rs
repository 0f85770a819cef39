//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the resolved base URL is a usable http(s) URL
//! - Validate value ranges (queue capacity, backoff bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before a client is built from the config

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no API base URL configured (set API_BASE_URL or API_BASE_URL_FALLBACK)")]
    MissingBaseUrl,

    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("auth.token_slots must name at least one slot")]
    NoTokenSlots,

    #[error("auth.login_path must start with '/', got '{0}'")]
    InvalidLoginPath(String),

    #[error("telemetry.queue_capacity must be greater than zero")]
    ZeroQueueCapacity,

    #[error("retries.max_delay_ms ({max}) is below retries.base_delay_ms ({base})")]
    BackoffBounds { base: u64, max: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.resolved_base_url() {
        None => errors.push(ValidationError::MissingBaseUrl),
        Some(raw) => match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: e.to_string(),
            }),
        },
    }

    if config.auth.token_slots.iter().all(|slot| slot.is_empty()) {
        errors.push(ValidationError::NoTokenSlots);
    }

    if !config.auth.login_path.starts_with('/') {
        errors.push(ValidationError::InvalidLoginPath(config.auth.login_path.clone()));
    }

    if config.telemetry.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }

    let retries = &config.retries;
    if retries.base_delay_ms > 0 && retries.max_delay_ms < retries.base_delay_ms {
        errors.push(ValidationError::BackoffBounds {
            base: retries.base_delay_ms,
            max: retries.max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.api.base_url = Some("https://crm.example.com/api".into());
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_base_url() {
        let errors = validate_config(&ClientConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingBaseUrl]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.api.base_url = Some("ftp://files.example.com".into());
        config.auth.token_slots.clear();
        config.auth.login_path = "login".into();
        config.telemetry.queue_capacity = 0;
        config.retries.base_delay_ms = 500;
        config.retries.max_delay_ms = 100;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::InvalidBaseUrl { .. }));
        assert!(errors.contains(&ValidationError::ZeroQueueCapacity));
    }
}
