//! Retry bookkeeping for failed page requests.
//!
//! Every failure class (transport, unreadable body, embedded server error) is
//! retried the same way: linear backoff of `attempt * backoff_unit`, up to
//! [`DEFAULT_MAX_RETRIES`] retries, so a page gets four attempts in total.

use std::time::Duration;

use tracing::{debug, instrument};

/// Retries allowed after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff unit (1 second).
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Zero-based attempt number of the retry.
        attempt: u32,
    },

    /// Give up.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Linear backoff retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default retry bound and the given unit.
    #[must_use]
    pub fn with_backoff_unit(backoff_unit: Duration) -> Self {
        Self {
            backoff_unit,
            ..Self::default()
        }
    }

    /// Returns the retry bound.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the backoff unit.
    #[must_use]
    pub fn backoff_unit(&self) -> Duration {
        self.backoff_unit
    }

    /// Decides what follows a failure of zero-based `attempt`.
    #[instrument(skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_retries {
            debug!(attempt, "retries exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("failed {} attempts", attempt + 1),
            };
        }

        let next = attempt + 1;
        let delay = self.backoff_unit.saturating_mul(next);
        debug!(next_attempt = next, delay_ms = delay.as_millis(), "will retry");
        RetryDecision::Retry {
            delay,
            attempt: next,
        }
    }
}
