//! Metadata resolution errors.

use thiserror::Error;

use crate::transport::{DecodeError, RequestError, TransportError};

/// Errors raised while resolving layer metadata.
///
/// All variants are fatal: paging never starts without metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The layer description or count could not be fetched.
    #[error("layer metadata unreachable at {url}")]
    Unreachable {
        /// The URL that failed.
        url: String,
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// The response could not be parsed, or carried a server error.
    #[error("invalid metadata payload from {url}")]
    InvalidPayload {
        /// The URL whose body was rejected.
        url: String,
        /// The decoding failure.
        #[source]
        source: DecodeError,
    },

    /// The server reports no records. May also mean "not yet indexed".
    #[error("layer at {url} reports zero features")]
    ZeroCount {
        /// The count query URL.
        url: String,
    },
}

impl MetadataError {
    /// Classifies a failed metadata request.
    #[must_use]
    pub fn from_request(error: RequestError) -> Self {
        match error {
            RequestError::Transport(source) => Self::Unreachable {
                url: source.url().to_string(),
                source,
            },
            RequestError::Decode { url, source } => Self::InvalidPayload { url, source },
        }
    }

    /// Creates a zero-count error.
    pub fn zero_count(url: impl Into<String>) -> Self {
        Self::ZeroCount { url: url.into() }
    }
}
