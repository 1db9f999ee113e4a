//! Bounded retry with exponential backoff and jitter.
//!
//! Only errors classified as retryable are retried; everything else fails
//! on the first attempt.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::domain::sync::SyncError;

/// Retry behavior for remote and database calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt (before jitter).
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to each delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_jitter,
        }
    }

    /// A policy with no delays, for tests and tooling.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// `base_delay * 2^(attempt-1)` for a 1-based failed attempt.
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Backoff plus uniform jitter in `[0, max_jitter]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt);
        let max_jitter_ms = self.max_jitter.as_millis() as u64;
        if max_jitter_ms == 0 {
            return base;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=max_jitter_ms);
        base.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or `max_attempts` is exhausted.
///
/// The returned error is the last classified failure, annotated with the
/// operation name and attempt count.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, SyncError>
where
    E: Into<SyncError>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err: SyncError = match f().await {
            Ok(value) => return Ok(value),
            Err(e) => e.into(),
        };

        if !err.is_retryable() || attempt >= max_attempts {
            return Err(err
                .with_context("operation", operation)
                .with_context("attempts", attempt.to_string()));
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::warn!(
            operation,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retryable failure, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
