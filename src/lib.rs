//! Featureservice Core Library
//!
//! Retrieves every record of an ArcGIS Feature Server or Map Server layer,
//! even when the layer is far larger than one request can return and the
//! server's paging support is unknown or unreliable.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`metadata`] - Layer capability discovery, resolved once per handle
//! - [`planner`] - Picks a paging strategy and builds page descriptors
//! - [`fetch`] - Throttled execution queue with per-page retries
//! - [`service`] - The [`FeatureService`] handle, URL parsing and request construction
//! - [`transport`] - HTTP transport seam and response decoding
//!
//! # Example
//!
//! ```no_run
//! use featureservice_core::{FeatureService, ServiceOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FeatureService::new(
//!     "https://services.arcgis.com/abc/arcgis/rest/services/Parks/FeatureServer/0",
//!     ServiceOptions::default(),
//! )?;
//!
//! let mut pages = service.fetch_all().await?;
//! while let Some(page) = pages.recv().await {
//!     println!("{} features", page?.feature_count());
//! }
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod metadata;
pub mod planner;
pub mod service;
pub mod transport;

mod user_agent;

// Re-export commonly used types
pub use fetch::{
    ExecutionQueue, FeaturePage, FetchError, FetchStats, PageStream, RequestExecutor,
    RetryPolicy, ThrottleController,
};
pub use metadata::{LayerMetadata, MetadataError, MetadataResolver};
pub use planner::{IdRange, PageDescriptor, PagingStrategy, Plan, Planner, PlanningError};
pub use service::{FeatureService, ServiceError, ServiceOptions, ServiceUrl, Statistic};
pub use transport::{DecodeError, HttpTransport, RawBody, RequestError, Transport, TransportError};
