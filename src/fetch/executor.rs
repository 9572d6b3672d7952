//! Single page attempts and their retry classification.

use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use super::page::FeaturePage;
use super::retry::{RetryDecision, RetryPolicy};
use super::task::Task;
use crate::service::LayerClient;
use crate::transport::RequestError;

/// Result of one attempt at one task.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The page was fetched.
    Success(FeaturePage),

    /// The attempt failed; run the task again after `delay`.
    Retry {
        /// The task, with its attempt counter advanced.
        task: Task,
        /// Backoff before the next attempt.
        delay: Duration,
        /// The failure that caused the retry.
        error: RequestError,
    },

    /// Retries are exhausted.
    Terminal {
        /// The failed task.
        task: Task,
        /// The last failure.
        error: RequestError,
    },
}

/// Runs one page request and decides what happens on failure.
///
/// The executor never sleeps: backoff is returned to the caller as a delay so
/// that waiting tasks do not occupy a worker slot.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    client: LayerClient,
    policy: RetryPolicy,
}

impl RequestExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(client: LayerClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs the attempt described by an in-flight `task`.
    #[instrument(skip_all, fields(page = task.index(), attempt = task.attempt()))]
    pub async fn execute(&self, mut task: Task) -> AttemptOutcome {
        let error = match self.client.page(task.descriptor()).await {
            Ok(payload) => {
                task.succeed();
                let page = FeaturePage {
                    index: task.index(),
                    descriptor: task.descriptor().clone(),
                    attempts: task.attempt() + 1,
                    payload,
                };
                if page.exceeded_transfer_limit() {
                    warn!(descriptor = %page.descriptor, "server truncated page");
                }
                debug!(features = page.feature_count(), "page fetched");
                return AttemptOutcome::Success(page);
            }
            Err(error) => error,
        };

        match self.policy.should_retry(task.attempt()) {
            RetryDecision::Retry { delay, attempt } => {
                warn!(
                    url = error.url(),
                    class = %error.class(),
                    code = error.code(),
                    next_attempt = attempt,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "page request failed, retrying"
                );
                task.retry_as(attempt);
                AttemptOutcome::Retry { task, delay, error }
            }
            RetryDecision::DoNotRetry { reason } => {
                error!(
                    url = error.url(),
                    class = %error.class(),
                    code = error.code(),
                    error = %error,
                    reason,
                    "page request failed permanently"
                );
                task.fail();
                AttemptOutcome::Terminal { task, error }
            }
        }
    }
}
