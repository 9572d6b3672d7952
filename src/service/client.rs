//! Single-shot requests against one layer: fetch, decode, reject embedded errors.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use super::endpoint::{LayerEndpoint, Statistic};
use crate::planner::{PageDescriptor, record_id};
use crate::transport::{DecodeError, RequestError, Transport, check_embedded_error, decode};

/// Issues JSON requests for one layer over a shared [`Transport`].
///
/// Cheap to clone; clones share the transport.
#[derive(Debug, Clone)]
pub struct LayerClient {
    transport: Arc<dyn Transport>,
    endpoint: LayerEndpoint,
}

impl LayerClient {
    /// Creates a client for the given endpoint.
    pub fn new(transport: Arc<dyn Transport>, endpoint: LayerEndpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    /// Returns the endpoint this client targets.
    #[must_use]
    pub fn endpoint(&self) -> &LayerEndpoint {
        &self.endpoint
    }

    /// Fetches `url` and decodes the body.
    ///
    /// A JSON body carrying an `error` object is a failure even though the
    /// transport succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] on transport, decode, or embedded server errors.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json(&self, url: &Url) -> Result<Value, RequestError> {
        let body = self.transport.fetch(url).await?;
        let value = decode(&body.bytes, body.content_encoding.as_deref())
            .and_then(check_embedded_error)
            .map_err(|e| RequestError::decode(url.as_str(), e))?;
        debug!("decoded response");
        Ok(value)
    }

    /// Service description (`<server>?f=json`).
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn service_info(&self) -> Result<Value, RequestError> {
        self.get_json(&self.endpoint.service_info_url()).await
    }

    /// Layer description (`<server>/<layer>?f=json`).
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn layer_info(&self) -> Result<Value, RequestError> {
        self.get_json(&self.endpoint.layer_info_url()).await
    }

    /// Total number of records in the layer.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json); additionally fails with
    /// [`DecodeError::MissingField`] when the response has no numeric `count`.
    pub async fn feature_count(&self) -> Result<u64, RequestError> {
        let url = self.endpoint.count_url();
        let json = self.get_json(&url).await?;
        json.get("count").and_then(Value::as_u64).ok_or_else(|| {
            RequestError::decode(url.as_str(), DecodeError::MissingField { field: "count" })
        })
    }

    /// Every object id in the layer, sorted ascending and de-duplicated.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json); additionally fails with
    /// [`DecodeError::MissingField`] when the response has no `objectIds` array,
    /// or [`DecodeError::InvalidValue`] when an entry is not an integer id.
    pub async fn object_ids(&self) -> Result<Vec<i64>, RequestError> {
        let url = self.endpoint.ids_url();
        let json = self.get_json(&url).await?;
        let ids = json
            .get("objectIds")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RequestError::decode(url.as_str(), DecodeError::MissingField { field: "objectIds" })
            })?;

        let mut ids = ids
            .iter()
            .map(|id| {
                record_id(id).ok_or_else(|| {
                    RequestError::decode(
                        url.as_str(),
                        DecodeError::InvalidValue {
                            field: "objectIds",
                            value: id.to_string(),
                        },
                    )
                })
            })
            .collect::<Result<Vec<i64>, _>>()?;
        ids.sort_unstable();
        ids.dedup();
        debug!(count = ids.len(), "fetched object ids");
        Ok(ids)
    }

    /// Aggregate statistics over `field`.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn statistics(
        &self,
        field: &str,
        stats: &[Statistic],
    ) -> Result<Value, RequestError> {
        self.get_json(&self.endpoint.statistics_url(field, stats))
            .await
    }

    /// One page of features.
    ///
    /// # Errors
    ///
    /// See [`get_json`](Self::get_json).
    pub async fn page(&self, descriptor: &PageDescriptor) -> Result<Value, RequestError> {
        self.get_json(&self.endpoint.page_url(descriptor)).await
    }
}
