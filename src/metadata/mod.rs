//! Layer capability discovery.
//!
//! [`MetadataResolver`] fetches the layer description (and, on servers that
//! advertise a version, the total record count) once and keeps the result for
//! the lifetime of the handle. Everything the planner decides is driven by the
//! resulting [`LayerMetadata`].

mod error;

pub use error::MetadataError;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::service::LayerClient;

/// Field type marking a layer's object identifier column.
const OID_FIELD_TYPE: &str = "esriFieldTypeOID";

/// Capability facts about one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerMetadata {
    /// Display name of the layer.
    pub name: Option<String>,
    /// Unique integer identifier field, if one is known.
    pub record_id_field: Option<String>,
    /// Server-declared maximum records per request.
    pub declared_page_size: Option<u64>,
    /// Server supports `resultOffset`/`resultRecordCount`.
    pub supports_offset_paging: bool,
    /// Server supports `outStatistics` queries.
    pub supports_statistics: bool,
    /// Server omitted `currentVersion`.
    pub is_legacy_server: bool,
    /// Advertised server version.
    pub current_version: Option<f64>,
    /// Geometry type, e.g. `esriGeometryPoint`.
    pub geometry_type: Option<String>,
    /// Total records in the layer. Not fetched on legacy servers.
    pub total_count: Option<u64>,
}

impl LayerMetadata {
    /// Derives metadata from a layer description. `total_count` is left unset.
    #[must_use]
    pub fn from_layer_info(info: &Value) -> Self {
        let current_version = info.get("currentVersion").and_then(Value::as_f64);
        let advanced = info.get("advancedQueryCapabilities");
        let advanced_flag = |name: &str| {
            advanced
                .and_then(|a| a.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };

        Self {
            name: info.get("name").and_then(Value::as_str).map(str::to_string),
            record_id_field: record_id_field(info),
            declared_page_size: declared_page_size(info),
            supports_offset_paging: advanced_flag("supportsPagination"),
            supports_statistics: info
                .get("supportsStatistics")
                .and_then(Value::as_bool)
                .unwrap_or(false)
                || advanced_flag("supportsStatistics"),
            is_legacy_server: info
                .get("currentVersion")
                .filter(|v| !v.is_null())
                .is_none(),
            current_version,
            geometry_type: info
                .get("geometryType")
                .and_then(Value::as_str)
                .map(str::to_string),
            total_count: None,
        }
    }
}

fn record_id_field(info: &Value) -> Option<String> {
    if let Some(field) = info.get("objectIdField").and_then(Value::as_str) {
        return Some(field.to_string());
    }
    info.get("fields")?
        .as_array()?
        .iter()
        .find(|f| f.get("type").and_then(Value::as_str) == Some(OID_FIELD_TYPE))
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn declared_page_size(info: &Value) -> Option<u64> {
    let size = match info.get("maxRecordCount")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    size.filter(|size| *size > 0)
}

/// Resolves and memoizes [`LayerMetadata`] for one layer.
#[derive(Debug)]
pub struct MetadataResolver {
    client: LayerClient,
    cached: OnceCell<LayerMetadata>,
}

impl MetadataResolver {
    /// Creates a resolver. No request is made until [`resolve`](Self::resolve).
    #[must_use]
    pub fn new(client: LayerClient) -> Self {
        Self {
            client,
            cached: OnceCell::new(),
        }
    }

    /// Returns the metadata, fetching it on first use.
    ///
    /// Concurrent first calls share one resolution. A failed resolution is not
    /// cached, so a later call tries again.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the layer description cannot be fetched
    /// or parsed, or the layer reports zero records.
    #[instrument(skip(self), fields(layer = self.client.endpoint().layer()))]
    pub async fn resolve(&self) -> Result<&LayerMetadata, MetadataError> {
        self.cached.get_or_try_init(|| self.fetch()).await
    }

    /// Returns the metadata if it has already been resolved.
    #[must_use]
    pub fn cached(&self) -> Option<&LayerMetadata> {
        self.cached.get()
    }

    async fn fetch(&self) -> Result<LayerMetadata, MetadataError> {
        let info = self
            .client
            .layer_info()
            .await
            .map_err(MetadataError::from_request)?;
        let mut metadata = LayerMetadata::from_layer_info(&info);

        if metadata.is_legacy_server {
            debug!("server reports no version, skipping count");
        } else {
            let count = self
                .client
                .feature_count()
                .await
                .map_err(MetadataError::from_request)?;
            if count == 0 {
                return Err(MetadataError::zero_count(
                    self.client.endpoint().count_url().as_str(),
                ));
            }
            metadata.total_count = Some(count);
        }

        info!(
            id_field = metadata.record_id_field.as_deref().unwrap_or("-"),
            page_size = ?metadata.declared_page_size,
            offset = metadata.supports_offset_paging,
            statistics = metadata.supports_statistics,
            legacy = metadata.is_legacy_server,
            count = ?metadata.total_count,
            "resolved layer metadata"
        );
        Ok(metadata)
    }
}
