//! Delay between retry attempts.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// How long to wait before a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Exponential backoff with up to 10% jitter, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl Backoff {
    /// `base_delay_ms = 0` means no backoff.
    pub fn from_config(config: &RetryConfig) -> Self {
        if config.base_delay_ms == 0 {
            Backoff::None
        } else {
            Backoff::Exponential {
                base_ms: config.base_delay_ms,
                max_ms: config.max_delay_ms.max(config.base_delay_ms),
            }
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let Backoff::Exponential { base_ms, max_ms } = *self else {
            return Duration::ZERO;
        };
        if retry == 0 {
            return Duration::ZERO;
        }

        let doubled = base_ms.saturating_mul(2u64.saturating_pow(retry - 1));
        let capped = doubled.min(max_ms);

        // Up to 10% extra so concurrent callers spread out.
        let spread = capped / 10;
        let jitter = if spread > 0 {
            rand::thread_rng().gen_range(0..spread)
        } else {
            0
        };
        Duration::from_millis(capped + jitter)
    }
}
