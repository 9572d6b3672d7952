//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, HeaderMap, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

use super::{RawBody, Transport, TransportError};
use crate::user_agent;

/// Default per-request timeout (90 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Default connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport built on a pooled reqwest client.
///
/// Create once per service handle and share; cloning is cheap.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds a transport with the given per-request timeout.
    ///
    /// Compressed bodies are requested explicitly and handed to the decoder
    /// untouched, together with their `Content-Encoding`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connection`] when the client cannot be built
    /// (for example when the TLS backend fails to initialize).
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .user_agent(user_agent::default_user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::connection("<client>", e.to_string()))?;

        debug!(
            timeout_ms = request_timeout.as_millis(),
            "created HTTP transport"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<RawBody, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url.as_str(), status.as_u16()));
        }

        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, &e))?;

        debug!(
            bytes = bytes.len(),
            content_encoding = content_encoding.as_deref().unwrap_or("identity"),
            "received body"
        );

        Ok(RawBody {
            bytes: bytes.to_vec(),
            content_encoding,
        })
    }
}

fn map_reqwest_error(url: &Url, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::timeout(url.as_str())
    } else {
        TransportError::connection(url.as_str(), error.to_string())
    }
}
