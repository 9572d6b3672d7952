//! Service address parsing and host-derived defaults.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use super::ServiceError;

/// Matches a Feature/Map Server root, optionally followed by a layer index.
#[allow(clippy::expect_used)]
static SERVICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?/(?:feature|map)server)(?:/(\d+))?")
        .expect("service regex is valid") // Static pattern, safe to panic
});

/// Matches ArcGIS Online hosted service hosts.
#[allow(clippy::expect_used)]
static HOSTED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"services(\d)?(qa|dev)?\.arcgis\.com").expect("hosted regex is valid")
});

/// First run of digits, optionally after a slash.
#[allow(clippy::expect_used)]
static LAYER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/?(\d+)").expect("layer regex is valid"));

/// Default concurrency for self-hosted servers.
const SELF_HOSTED_CONCURRENCY: usize = 4;

/// Default concurrency for ArcGIS Online hosted services.
const HOSTED_CONCURRENCY: usize = 16;

/// A parsed service address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrl {
    /// The `.../FeatureServer` or `.../MapServer` root.
    pub server: Url,
    /// Layer index embedded in the address, if any.
    pub layer: Option<u32>,
    /// Whether the service lives on ArcGIS Online infrastructure.
    pub hosted: bool,
}

impl ServiceUrl {
    /// Parses a service address such as
    /// `https://host/arcgis/rest/services/Roads/FeatureServer/2`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidUrl`] when the address is not a feature
    /// or map server, or the server part is not a valid absolute URL.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        let raw = raw.trim();
        let captures = SERVICE_PATTERN
            .captures(raw)
            .ok_or_else(|| ServiceError::invalid_url(raw))?;

        let server_str = captures
            .get(1)
            .map(|m| m.as_str())
            .ok_or_else(|| ServiceError::invalid_url(raw))?;
        let server = Url::parse(server_str).map_err(|_| ServiceError::invalid_url(raw))?;
        if server.cannot_be_a_base() {
            return Err(ServiceError::invalid_url(raw));
        }

        let layer = captures.get(2).and_then(|m| m.as_str().parse().ok());
        let hosted = HOSTED_PATTERN.is_match(raw);

        debug!(server = %server, ?layer, hosted, "parsed service url");
        Ok(Self {
            server,
            layer,
            hosted,
        })
    }
}

/// Extracts a layer index from loosely formatted input (`"3"`, `"/3"`, `"layer/3"`).
#[must_use]
pub fn sanitize_layer(raw: &str) -> Option<u32> {
    LAYER_PATTERN
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Suggests a page-request concurrency for a service.
///
/// Hosted services get a higher ceiling. Non-point layers carry heavier
/// geometries per record, so they get a quarter of it.
#[must_use]
pub fn suggested_concurrency(hosted: bool, geometry_type: Option<&str>) -> usize {
    let naive = if hosted {
        HOSTED_CONCURRENCY
    } else {
        SELF_HOSTED_CONCURRENCY
    };
    let Some(geometry_type) = geometry_type else {
        return naive;
    };
    if geometry_type.to_ascii_lowercase().contains("point") {
        naive
    } else {
        (naive / 4).max(1)
    }
}
