//! Page fetching: the execution queue, its throttle, and per-request retries.
//!
//! # Overview
//!
//! - [`ExecutionQueue`] runs a plan with at most `max_concurrency` requests in
//!   flight and hands pages back through a [`PageStream`].
//! - [`ThrottleController`] shrinks the live pool on failures and grows it back
//!   on successes.
//! - [`RequestExecutor`] performs one attempt and applies the [`RetryPolicy`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use featureservice_core::fetch::{ExecutionQueue, RequestExecutor, RetryPolicy};
//! use featureservice_core::planner::PageDescriptor;
//! use featureservice_core::service::{LayerClient, LayerEndpoint};
//! use featureservice_core::transport::{DEFAULT_REQUEST_TIMEOUT, HttpTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = url::Url::parse("https://example.com/arcgis/rest/services/Roads/FeatureServer")?;
//! let transport = Arc::new(HttpTransport::new(DEFAULT_REQUEST_TIMEOUT)?);
//! let client = LayerClient::new(transport, LayerEndpoint::new(server, 0));
//! let queue = ExecutionQueue::new(RequestExecutor::new(client, RetryPolicy::default()), 4);
//!
//! let pages = queue.submit(vec![PageDescriptor::Layer]).collect_pages().await?;
//! println!("{} pages", pages.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
mod page;
mod queue;
mod retry;
mod task;
mod throttle;

pub use error::FetchError;
pub use executor::{AttemptOutcome, RequestExecutor};
pub use page::FeaturePage;
pub use queue::{ExecutionQueue, FetchStats, PageResult, PageStream};
pub use retry::{DEFAULT_BACKOFF_UNIT, DEFAULT_MAX_RETRIES, RetryDecision, RetryPolicy};
pub use task::{Task, TaskState};
pub use throttle::{FAILURE_STEP, SUCCESS_STEP, ThrottleController};
