//! Error types for the transport and decoding layer.
//!
//! [`TransportError`] covers failures to obtain a body at all, [`DecodeError`]
//! covers bodies that cannot be turned into usable JSON (including JSON that
//! carries a server-side error object), and [`RequestError`] joins the two with
//! the URL that was requested.

use thiserror::Error;

/// Errors raised while performing a single HTTP GET.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the configured per-call timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection-level failure (DNS, refused connection, TLS, broken body stream).
    #[error("connection error requesting {url}: {message}")]
    Connection {
        /// The URL that failed.
        url: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

impl TransportError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a connection error.
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Returns the URL the failed request targeted.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Connection { url, .. } | Self::HttpStatus { url, .. } => {
                url
            }
        }
    }

    /// Returns the error code reported for this failure.
    ///
    /// Timeouts map to 504 so they read like a gateway timeout in logs.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Timeout { .. } => 504,
            Self::Connection { .. } => 500,
            Self::HttpStatus { status, .. } => i64::from(*status),
        }
    }
}

/// Errors raised while turning a response body into JSON.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body was empty (or only whitespace).
    #[error("server returned an empty body")]
    Empty,

    /// The body does not start like a JSON document.
    #[error("received HTML or plain text when expecting JSON")]
    NotJson,

    /// The body looked like JSON but failed to parse.
    #[error("failed to parse server response: {source}")]
    Malformed {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The response used a content encoding the decoder does not support.
    #[error("unsupported content encoding {encoding:?}")]
    UnsupportedEncoding {
        /// The offending `Content-Encoding` value.
        encoding: String,
    },

    /// Decompressing the body failed.
    #[error("failed to decompress {encoding} body: {source}")]
    Decompress {
        /// The encoding that was being undone.
        encoding: String,
        /// The underlying IO error from the decompressor.
        #[source]
        source: std::io::Error,
    },

    /// The JSON is well-formed but missing a member the caller needs.
    #[error("response is missing `{field}`")]
    MissingField {
        /// The missing member name.
        field: &'static str,
    },

    /// A member holds a value of the wrong shape.
    #[error("response `{field}` has an invalid entry: {value}")]
    InvalidValue {
        /// The member name.
        field: &'static str,
        /// The offending value, as JSON text.
        value: String,
    },

    /// The JSON payload encodes a server-side error object.
    #[error("server error {code}: {message}")]
    Server {
        /// Error code from the payload (500 when the server gave none).
        code: i64,
        /// Error message from the payload.
        message: String,
        /// Extra detail lines from the payload, if any.
        details: Vec<String>,
    },
}

impl DecodeError {
    /// Returns `true` if this error came from an embedded server error object.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

/// Broad class of a failed request, used for logging and retry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transport or timeout failure.
    Transport,
    /// Empty, non-JSON, or otherwise undecodable body.
    Body,
    /// Well-formed response whose payload reports a server-side error.
    Server,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => f.write_str("transport"),
            Self::Body => f.write_str("body"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// A failed request against the service, with the URL that was requested.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport could not produce a body.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The body could not be decoded, or carried an embedded error.
    #[error("{source} (requesting {url})")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The decoding failure.
        #[source]
        source: DecodeError,
    },
}

impl RequestError {
    /// Creates a decode error for the given URL.
    pub fn decode(url: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Returns the URL of the failed request.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transport(e) => e.url(),
            Self::Decode { url, .. } => url,
        }
    }

    /// Classifies the failure into one of the three retryable classes.
    #[must_use]
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Transport(_) => FailureClass::Transport,
            Self::Decode { source, .. } if source.is_server_error() => FailureClass::Server,
            Self::Decode { .. } => FailureClass::Body,
        }
    }

    /// Returns the error code associated with this failure.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::Transport(e) => e.code(),
            Self::Decode {
                source: DecodeError::Server { code, .. },
                ..
            } => *code,
            Self::Decode { .. } => 500,
        }
    }
}
