//! Bounded retry with linear backoff
//!
//! Failures are classified after every attempt. Permanent kinds are returned
//! immediately; transient ones are retried after `base_backoff * attempt`
//! until the attempt budget is spent.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::GenerationError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay after the given 1-based failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    ///
    /// A zero `max_attempts` still makes one attempt.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => GenerationError::classify(e),
            };

            if !error.is_retryable() {
                debug!(attempt, kind = %error.kind(), "non-retryable failure: {}", error);
                return Err(error);
            }

            if attempt >= max_attempts {
                debug!(attempt, kind = %error.kind(), "retries exhausted: {}", error);
                return Err(error);
            }

            let delay = self.backoff_for(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                kind = %error.kind(),
                "attempt failed, retrying: {}",
                error
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Convenience wrapper over [`RetryPolicy::run`].
pub async fn with_retry<T, E, F, Fut>(
    operation: F,
    max_attempts: u32,
    base_backoff_ms: u64,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    RetryPolicy::new(max_attempts, Duration::from_millis(base_backoff_ms))
        .run(operation)
        .await
}
