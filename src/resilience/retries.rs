//! Retry logic.
//!
//! # Responsibilities
//! - Run one logical call as a bounded sequence of attempts
//! - Report every attempt, and every decision to retry, to telemetry
//!
//! # Design Decisions
//! - Total attempts = `max_retries + 1`
//! - Attempt n+1 starts only after attempt n has settled
//! - Every failure is retried within the budget, 401 included; only
//!   request-encoding failures end the call early
//! - Backoff is a policy parameter; the default retries immediately

use std::future::Future;
use std::time::Instant;

use uuid::Uuid;

use crate::client::error::ApiError;
use crate::clock::Clock;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::telemetry::{latency_ms, Outcome, TelemetryEmitter, TelemetryEvent};

/// Identity of a logical call, copied onto each of its telemetry events.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub call_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub request_bytes: usize,
}

/// What a single attempt produced.
#[derive(Debug)]
pub struct AttemptReport<T> {
    pub result: Result<T, ApiError>,
    pub status: Option<u16>,
    pub response_bytes: usize,
}

struct RetryContext {
    attempt: u32,
    max_retries: u32,
    started_at: Instant,
}

/// Bounded retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Backoff::from_config(config))
    }

    /// Run `execute_once` until it succeeds or the retry budget is spent.
    ///
    /// `execute_once` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        call: &CallInfo,
        telemetry: &TelemetryEmitter,
        clock: &dyn Clock,
        mut execute_once: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AttemptReport<T>>,
    {
        let mut ctx = RetryContext {
            attempt: 0,
            max_retries: self.max_retries,
            started_at: clock.now(),
        };

        loop {
            let timestamp_ms = clock.unix_millis();
            let attempt_start = clock.now();
            let AttemptReport {
                result,
                status,
                response_bytes,
            } = execute_once(ctx.attempt).await;
            let latency = latency_ms(attempt_start, clock.now());

            let event = |outcome, message: Option<String>, retry_attempt| TelemetryEvent {
                call_id: call.call_id,
                timestamp_ms,
                endpoint: call.endpoint.clone(),
                method: call.method.clone(),
                latency_ms: latency,
                outcome,
                http_status: status,
                retry_attempt,
                request_bytes: call.request_bytes,
                response_bytes,
                message,
            };

            let err = match result {
                Ok(value) => {
                    telemetry.emit(event(Outcome::Ok, None, ctx.attempt));
                    metrics::record_attempt(&call.method, Outcome::Ok.as_str(), latency);
                    return Ok(value);
                }
                Err(err) => err,
            };

            telemetry.emit(event(Outcome::Failed, Some(err.message.clone()), ctx.attempt));
            metrics::record_attempt(&call.method, Outcome::Failed.as_str(), latency);

            if ctx.attempt >= ctx.max_retries || !err.is_retryable() {
                if ctx.attempt > 0 {
                    tracing::warn!(
                        call_id = %call.call_id,
                        endpoint = %call.endpoint,
                        attempts = ctx.attempt + 1,
                        elapsed_ms = latency_ms(ctx.started_at, clock.now()),
                        error = %err,
                        "Retry budget exhausted"
                    );
                }
                return Err(err);
            }

            ctx.attempt += 1;
            telemetry.emit(event(
                Outcome::RetryAttempt,
                Some(format!("retrying after: {}", err.message)),
                ctx.attempt,
            ));
            metrics::record_retry(&call.method);

            let delay = self.backoff.delay(ctx.attempt);
            tracing::info!(
                call_id = %call.call_id,
                endpoint = %call.endpoint,
                attempt = ctx.attempt,
                max_retries = ctx.max_retries,
                delay = ?delay,
                error = %err,
                "Retrying request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
