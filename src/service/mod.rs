//! The service handle: one layer of one Feature or Map Server.
//!
//! [`FeatureService`] ties the pieces together. It parses the address, owns
//! the shared [`LayerClient`] and the memoized metadata, and exposes
//! [`resolve_metadata`](FeatureService::resolve_metadata),
//! [`plan`](FeatureService::plan) and [`fetch_all`](FeatureService::fetch_all).

mod address;
mod client;
mod endpoint;
mod error;

pub use address::{ServiceUrl, sanitize_layer, suggested_concurrency};
pub use client::LayerClient;
pub use endpoint::{LayerEndpoint, Statistic};
pub use error::ServiceError;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::fetch::{DEFAULT_BACKOFF_UNIT, ExecutionQueue, PageStream, RequestExecutor, RetryPolicy};
use crate::metadata::{LayerMetadata, MetadataResolver};
use crate::planner::{Plan, Planner};
use crate::transport::{DEFAULT_REQUEST_TIMEOUT, HttpTransport, Transport};

/// Lowest accepted concurrency.
pub const MIN_CONCURRENCY: usize = 1;

/// Highest accepted concurrency.
pub const MAX_CONCURRENCY: usize = 100;

/// Default ceiling on records per page requested by the caller.
pub const DEFAULT_MAX_PAGE_SIZE: u64 = 5000;

/// Caller configuration for a [`FeatureService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Layer index. Overrides any index embedded in the URL.
    pub layer: Option<u32>,
    /// Upper bound on records per page.
    pub max_page_size: u64,
    /// Concurrency ceiling. Derived from the host and geometry when unset.
    pub max_concurrency: Option<usize>,
    /// Retry delay unit; retry `n` waits `n * backoff_unit`.
    pub backoff_unit: Duration,
    /// Per-request timeout for the built-in HTTP transport.
    pub request_timeout: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            layer: None,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_concurrency: None,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServiceOptions {
    fn validate(&self) -> Result<(), ServiceError> {
        if let Some(value) = self.max_concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&value)
        {
            return Err(ServiceError::InvalidConcurrency { value });
        }
        if self.max_page_size == 0 {
            return Err(ServiceError::InvalidPageSize {
                value: self.max_page_size,
            });
        }
        Ok(())
    }
}

/// Handle on one layer of a remote feature service.
#[derive(Debug)]
pub struct FeatureService {
    url: ServiceUrl,
    options: ServiceOptions,
    client: LayerClient,
    metadata: MetadataResolver,
    service_info: OnceCell<Value>,
}

impl FeatureService {
    /// Creates a handle using the built-in HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the URL is not a feature or map server,
    /// the options are out of range, or the HTTP client cannot be built.
    pub fn new(url: &str, options: ServiceOptions) -> Result<Self, ServiceError> {
        options.validate()?;
        let transport = HttpTransport::new(options.request_timeout)?;
        Self::with_transport(url, options, Arc::new(transport))
    }

    /// Creates a handle over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the URL is not a feature or map server or
    /// the options are out of range.
    pub fn with_transport(
        url: &str,
        options: ServiceOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ServiceError> {
        options.validate()?;
        let url = ServiceUrl::parse(url)?;
        let layer = options.layer.or(url.layer).unwrap_or(0);
        let client = LayerClient::new(transport, LayerEndpoint::new(url.server.clone(), layer));

        info!(server = %url.server, layer, hosted = url.hosted, "opened feature service");
        Ok(Self {
            metadata: MetadataResolver::new(client.clone()),
            url,
            options,
            client,
            service_info: OnceCell::new(),
        })
    }

    /// The parsed service address.
    #[must_use]
    pub fn url(&self) -> &ServiceUrl {
        &self.url
    }

    /// The layer index in use.
    #[must_use]
    pub fn layer(&self) -> u32 {
        self.client.endpoint().layer()
    }

    /// Whether the service is hosted on ArcGIS Online.
    #[must_use]
    pub fn hosted(&self) -> bool {
        self.url.hosted
    }

    /// The options the handle was created with.
    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// The layer client, for direct requests.
    #[must_use]
    pub fn client(&self) -> &LayerClient {
        &self.client
    }

    /// Resolves (once) and returns the layer metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Metadata`] on failure.
    pub async fn resolve_metadata(&self) -> Result<&LayerMetadata, ServiceError> {
        Ok(self.metadata.resolve().await?)
    }

    /// Concurrency used by [`fetch_all`](Self::fetch_all): the configured
    /// value, or one suggested from the host and geometry type.
    #[must_use]
    pub fn concurrency(&self, metadata: &LayerMetadata) -> usize {
        self.options.max_concurrency.unwrap_or_else(|| {
            suggested_concurrency(self.url.hosted, metadata.geometry_type.as_deref())
        })
    }

    /// Builds the paging plan for the layer.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Metadata`] or [`ServiceError::Planning`].
    #[instrument(skip(self), fields(layer = self.layer()))]
    pub async fn plan(&self) -> Result<Plan, ServiceError> {
        let metadata = self.resolve_metadata().await?;
        let planner = Planner::new(self.client.clone(), self.options.max_page_size);
        Ok(planner.plan(metadata).await?)
    }

    /// Plans the layer and starts fetching every page.
    ///
    /// Metadata and planning failures are returned here, before any page is
    /// requested. Page failures arrive through the stream.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Metadata`] or [`ServiceError::Planning`].
    #[instrument(skip(self), fields(layer = self.layer()))]
    pub async fn fetch_all(&self) -> Result<PageStream, ServiceError> {
        let metadata = self.resolve_metadata().await?;
        let concurrency = self.concurrency(metadata);
        let plan = Planner::new(self.client.clone(), self.options.max_page_size)
            .plan(metadata)
            .await?;

        info!(
            strategy = %plan.strategy,
            pages = plan.len(),
            concurrency,
            "fetching layer"
        );
        let executor = RequestExecutor::new(
            self.client.clone(),
            RetryPolicy::with_backoff_unit(self.options.backoff_unit),
        );
        Ok(ExecutionQueue::new(executor, concurrency).submit(plan.pages))
    }

    /// Service description, fetched once.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Client`] on failure.
    pub async fn service_info(&self) -> Result<&Value, ServiceError> {
        Ok(self
            .service_info
            .get_or_try_init(|| self.client.service_info())
            .await?)
    }

    /// Layer description.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Client`] on failure.
    pub async fn layer_info(&self) -> Result<Value, ServiceError> {
        Ok(self.client.layer_info().await?)
    }

    /// Total records in the layer.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Client`] on failure.
    pub async fn feature_count(&self) -> Result<u64, ServiceError> {
        Ok(self.client.feature_count().await?)
    }

    /// Every object id in the layer, sorted and de-duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Client`] on failure.
    pub async fn object_ids(&self) -> Result<Vec<i64>, ServiceError> {
        Ok(self.client.object_ids().await?)
    }

    /// Aggregate statistics over `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Client`] on failure.
    pub async fn statistics(&self, field: &str, stats: &[Statistic]) -> Result<Value, ServiceError> {
        Ok(self.client.statistics(field, stats).await?)
    }
}
