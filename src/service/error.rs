//! Handle-level errors.

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::planner::PlanningError;
use crate::transport::{RequestError, TransportError};

/// Errors raised by [`FeatureService`](super::FeatureService).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The address is not a Feature Server or Map Server URL.
    #[error("invalid service url: {url}")]
    InvalidUrl {
        /// The rejected address.
        url: String,
    },

    /// Configured concurrency is outside the accepted range.
    #[error("invalid concurrency {value}: must be between {min} and {max}", min = super::MIN_CONCURRENCY, max = super::MAX_CONCURRENCY)]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// Configured page size is zero.
    #[error("invalid max page size {value}: must be at least 1")]
    InvalidPageSize {
        /// The rejected value.
        value: u64,
    },

    /// The HTTP transport could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A direct request against the service failed.
    #[error(transparent)]
    Client(#[from] RequestError),

    /// Layer metadata could not be resolved.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// No paging plan could be built.
    #[error(transparent)]
    Planning(#[from] PlanningError),
}

impl ServiceError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
