//! Response body decoding: decompression, JSON parsing, embedded-error checks.
//!
//! Feature services are loose about what they send back. Bodies may be gzip or
//! deflate compressed, may be an HTML error page instead of JSON, may contain
//! bare `NaN`/`Infinity` number tokens that strict JSON rejects, and may be a
//! perfectly valid JSON document whose only content is an `error` object.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use serde_json::Value;
use tracing::trace;

use super::error::DecodeError;

/// Error code used when an embedded error object carries none.
const DEFAULT_SERVER_ERROR_CODE: i64 = 500;

/// Non-finite number tokens some servers emit, longest first so `-Infinity`
/// wins over `Infinity`.
const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

/// Decodes a raw response body into JSON.
///
/// `content_encoding` is the response's `Content-Encoding` header value, if
/// any. Identity, gzip and deflate are supported.
///
/// # Errors
///
/// Returns [`DecodeError`] when the body cannot be decompressed, is empty, is
/// not JSON (for example an HTML error page), or fails to parse.
pub fn decode(body: &[u8], content_encoding: Option<&str>) -> Result<Value, DecodeError> {
    let raw = decompress(body, content_encoding)?;
    let text = String::from_utf8_lossy(&raw);
    let trimmed = text.trim_start();

    match trimmed.chars().next() {
        None => return Err(DecodeError::Empty),
        Some('{' | '[') => {}
        Some(_) => return Err(DecodeError::NotJson),
    }

    let normalized = normalize_non_finite(trimmed);
    serde_json::from_str(&normalized).map_err(|source| DecodeError::Malformed { source })
}

/// Rejects payloads that encode a server-side error object.
///
/// Services report most failures as HTTP 200 with a body like
/// `{"error": {"code": 400, "message": "...", "details": [...]}}`.
///
/// # Errors
///
/// Returns [`DecodeError::Server`] when the payload has an `error` member.
pub fn check_embedded_error(value: Value) -> Result<Value, DecodeError> {
    let Some(error) = value.get("error").filter(|e| !e.is_null()) else {
        return Ok(value);
    };

    let code = error
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_SERVER_ERROR_CODE);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown server error")
        .to_string();
    let details = error
        .get("details")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Err(DecodeError::Server {
        code,
        message,
        details,
    })
}

fn decompress<'a>(
    body: &'a [u8],
    content_encoding: Option<&str>,
) -> Result<Cow<'a, [u8]>, DecodeError> {
    let encoding = content_encoding
        .map(|e| e.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match encoding.as_str() {
        "" | "identity" => Ok(Cow::Borrowed(body)),
        "gzip" | "x-gzip" => read_all(GzDecoder::new(body), &encoding).map(Cow::Owned),
        "deflate" => {
            // Servers disagree on whether "deflate" means zlib-wrapped or raw.
            match read_all(ZlibDecoder::new(body), &encoding) {
                Ok(bytes) => Ok(Cow::Owned(bytes)),
                Err(_) => read_all(DeflateDecoder::new(body), &encoding).map(Cow::Owned),
            }
        }
        _ => Err(DecodeError::UnsupportedEncoding { encoding }),
    }
}

fn read_all(mut reader: impl Read, encoding: &str) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| DecodeError::Decompress {
            encoding: encoding.to_string(),
            source,
        })?;
    trace!(encoding, decompressed_bytes = out.len(), "decompressed body");
    Ok(out)
}

/// Replaces bare `NaN`, `Infinity` and `-Infinity` tokens outside string
/// literals with `null`.
fn normalize_non_finite(text: &str) -> Cow<'_, str> {
    if !text.contains("NaN") && !text.contains("Infinity") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}
