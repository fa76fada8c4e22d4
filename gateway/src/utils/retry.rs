//! Deadlines and bounded retries for calls to external speech/dialogue services.
//!
//! Every recognizer, synthesizer, dialogue and telephony-control call made on
//! behalf of a session goes through a [`CallPolicy`], so a slow or dead
//! upstream can never stall a call indefinitely.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Errors that can be produced by a call guarded by a [`CallPolicy`].
pub trait PolicyError: std::fmt::Display + Sized {
    /// Error value reported when an attempt exceeds the deadline.
    fn timed_out(operation: &str, after: Duration) -> Self;

    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;
}

/// Deadline and retry configuration for one class of external call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    /// Deadline applied to each individual attempt.
    /// Default: 10s
    pub timeout: Duration,

    /// Total number of attempts, including the first one. Values below 1 are
    /// treated as 1.
    /// Default: 2
    pub max_attempts: u32,

    /// Delay before the first retry.
    /// Default: 200ms
    pub initial_backoff: Duration,

    /// Upper bound for the delay between attempts.
    /// Default: 2s
    pub max_backoff: Duration,

    /// Multiplier for exponential backoff.
    /// Default: 2.0
    pub backoff_multiplier: f32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl CallPolicy {
    /// A policy with the given deadline and no retries.
    pub fn single_attempt(timeout: Duration) -> Self {
        Self {
            timeout,
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based) using exponential backoff.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64();
        let factor = (self.backoff_multiplier as f64).powi(retry.saturating_sub(1) as i32);
        let delay = (base * factor).min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(delay.max(0.0))
    }

    /// Run `call` under this policy.
    ///
    /// Each attempt is bounded by `timeout`. Retryable failures (including
    /// timeouts) are retried with backoff until `max_attempts` is reached; the
    /// last error is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        E: PolicyError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let error = match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => E::timed_out(operation, self.timeout),
            };

            if attempt >= max_attempts || !error.is_retryable() {
                return Err(error);
            }

            let delay = self.backoff_for(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "External call failed, retrying: {}",
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
