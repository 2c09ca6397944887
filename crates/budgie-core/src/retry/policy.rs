use std::collections::HashSet;
use std::time::Duration;

use crate::api::ApiError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy with jitter and a server-hint override.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the computed backoff delay.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub backoff_multiplier: f64,
    /// Statuses retried even when the error kind alone would not be.
    pub retryable_status_codes: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            retryable_status_codes: [408, 429, 500, 502, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Decide whether and when to retry. `attempt` is 1-based (1 = the
    /// attempt that just failed).
    ///
    /// A server-supplied `Retry-After` is authoritative and used
    /// verbatim; otherwise the delay is `initial * multiplier^(attempt-1)`
    /// capped at `max_delay`, then jittered by ±25%.
    pub fn decide(&self, attempt: u32, error: &ApiError) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        let status_retryable = error
            .status
            .is_some_and(|s| self.retryable_status_codes.contains(&s));
        if !error.is_retryable() && !status_retryable {
            return RetryDecision::NoRetry;
        }

        if let Some(hint) = error.retry_after {
            return RetryDecision::RetryAfter(hint);
        }

        RetryDecision::RetryAfter(self.backoff_delay(attempt.saturating_sub(1)))
    }

    /// Jittered exponential delay for a 0-based attempt index.
    fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt_index.min(16) as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        // Symmetric jitter: scale into [0.75, 1.25].
        let jitter = 1.0 + 0.25 * (rand::random::<f64>() * 2.0 - 1.0);
        Duration::from_millis((capped * jitter).max(0.0) as u64)
    }
}
