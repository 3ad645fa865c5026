//! Retry policy and backoff computation
//!
//! Transient and conflict failures retry with jittered exponential backoff:
//! 500 ms base, doubling per attempt, capped at 8 s, ±20% jitter. A rate
//! limit honors the workspace's retry-after hint (capped at 30 s) and does
//! not consume an attempt.

use std::time::Duration;

use docpress_domain::constants::{
    DEFAULT_MAX_RETRIES, RETRY_AFTER_CAP_SECS, RETRY_BASE_DELAY_MS, RETRY_JITTER,
    RETRY_MAX_DELAY_MS,
};
use rand::Rng;

/// Retry configuration for one client instance
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts per operation
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero-based), with jitter
    #[must_use]
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = RETRY_BASE_DELAY_MS.saturating_mul(1_u64 << attempt.min(6));
        let capped = exp.min(RETRY_MAX_DELAY_MS);
        let jitter = rand::rng().random_range(-RETRY_JITTER..=RETRY_JITTER);
        Duration::from_millis(((capped as f64) * (1.0 + jitter)).max(0.0) as u64)
    }

    /// Sleep to honor a retry-after hint, capped at the policy ceiling
    #[must_use]
    pub fn retry_after(&self, hint_secs: Option<u64>) -> Duration {
        let secs = hint_secs
            .unwrap_or(1)
            .min(RETRY_AFTER_CAP_SECS);
        Duration::from_secs(secs.max(1))
    }
}
