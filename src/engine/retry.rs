//! Bounded exponential-backoff retry for remote calls

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::core::constants::{defaults, timeouts};
use crate::core::error::RemoteError;

/// Process-wide retry settings. Built once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the uniform random delay added to each backoff
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(timeouts::DEFAULT_RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(timeouts::DEFAULT_RETRY_MAX_DELAY_MS),
            jitter: Duration::from_millis(timeouts::DEFAULT_RETRY_JITTER_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Deterministic part of the delay before retry number `attempt` (0-based):
    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Backoff plus uniform jitter in `[0, jitter]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + random_jitter(self.jitter)
    }
}

fn random_jitter(bound: Duration) -> Duration {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=bound_ms))
}

/// Run `op` until it succeeds, fails terminally, or the attempt budget is spent.
///
/// Only failures whose class is retryable are attempted again. The error
/// returned after exhaustion is the last one produced, untouched.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() {
                    debug!("{operation}: terminal failure, not retrying: {err}");
                    return Err(err);
                }
                if attempt >= max_attempts {
                    warn!("{operation}: giving up after {attempt} attempt(s): {err}");
                    return Err(err);
                }

                let delay = policy.delay_for(attempt - 1);
                crate::logging::log_retry(operation, attempt, max_attempts, delay, &err);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
