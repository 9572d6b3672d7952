//! Transport seam between the paging core and the network.
//!
//! The core only ever asks for "the body at this URL". [`Transport`] is that
//! contract; [`HttpTransport`] is the reqwest-backed implementation used in
//! production, and tests substitute their own implementations.
//!
//! Decoding is kept separate from fetching so a transport stays a dumb pipe:
//! see [`decode`] and [`check_embedded_error`].

mod client;
mod decode;
mod error;
#[cfg(test)]
pub(crate) mod fake;

pub use client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, HttpTransport};
pub use decode::{check_embedded_error, decode};
pub use error::{DecodeError, FailureClass, RequestError, TransportError};

use async_trait::async_trait;
use url::Url;

/// A raw, undecoded response body.
#[derive(Debug, Clone, Default)]
pub struct RawBody {
    /// Body bytes exactly as received.
    pub bytes: Vec<u8>,
    /// Value of the `Content-Encoding` response header, if any.
    pub content_encoding: Option<String>,
}

impl RawBody {
    /// Creates an uncompressed body.
    pub fn identity(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_encoding: None,
        }
    }
}

/// Performs a single HTTP GET and returns the undecoded body.
///
/// Implementations own the per-call timeout. They must not retry; retrying is
/// the paging core's job.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetches the body at `url`.
    async fn fetch(&self, url: &Url) -> Result<RawBody, TransportError>;
}
