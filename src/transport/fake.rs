//! In-memory [`Transport`] for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use super::{RawBody, Transport, TransportError};

type Responder = Box<dyn Fn(&Url) -> Result<RawBody, TransportError> + Send + Sync>;

/// Answers each request from the first route whose needle occurs in the URL.
///
/// Unrouted requests fail with HTTP 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Vec<(String, Responder)>,
    calls: Mutex<Vec<String>>,
}

impl std::fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeTransport")
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route<F>(mut self, needle: &str, responder: F) -> Self
    where
        F: Fn(&Url) -> Result<RawBody, TransportError> + Send + Sync + 'static,
    {
        self.routes.push((needle.to_string(), Box::new(responder)));
        self
    }

    pub(crate) fn json(self, needle: &str, value: Value) -> Self {
        let body = value.to_string();
        self.route(needle, move |_| Ok(RawBody::identity(body.clone())))
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub(crate) fn count_calls(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }
}

/// Decoded value of query parameter `key`, if present.
pub(crate) fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &Url) -> Result<RawBody, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        self.routes
            .iter()
            .find(|(needle, _)| url.as_str().contains(needle.as_str()))
            .map_or_else(
                || Err(TransportError::http_status(url.as_str(), 404)),
                |(_, responder)| responder(url),
            )
    }
}
