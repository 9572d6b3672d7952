//! Batch fetch errors.

use thiserror::Error;

use crate::transport::RequestError;

/// Terminal failure of a batch fetch. At most one is ever emitted per stream.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A page exhausted its retries and the batch was aborted.
    #[error("fetch aborted: page at {url} failed after {attempts} attempts")]
    Aborted {
        /// The failing page request.
        url: String,
        /// Attempts made for that page.
        attempts: u32,
        /// The last failure.
        #[source]
        source: RequestError,
    },

    /// A request worker panicked or was torn down unexpectedly.
    #[error("fetch worker failed: {message}")]
    WorkerFailed {
        /// Description from the runtime.
        message: String,
    },
}

impl FetchError {
    /// Creates an abort error from the last failure of a page.
    #[must_use]
    pub fn aborted(attempts: u32, source: RequestError) -> Self {
        Self::Aborted {
            url: source.url().to_string(),
            attempts,
            source,
        }
    }

    /// Creates a worker failure error.
    pub fn worker_failed(message: impl Into<String>) -> Self {
        Self::WorkerFailed {
            message: message.into(),
        }
    }
}
