//! Paging plan construction.
//!
//! The [`Planner`] turns resolved [`LayerMetadata`] into an ordered list of
//! [`PageDescriptor`]s. Layers small enough for one request get a single page.
//! Otherwise strategies are tried in a fixed order:
//!
//! 1. offset paging, when the server supports it and the count is known
//! 2. identifier ranges from `min`/`max` statistics
//! 3. identifier ranges cut from the full id list
//!
//! A strategy that is not applicable is skipped; a strategy whose request
//! fails hands over to the next one.

mod descriptor;
mod stats;
mod strategy;

pub use descriptor::{IdRange, PageDescriptor};
pub(crate) use descriptor::record_id;
pub use stats::find_min_max;
pub use strategy::{PagingStrategy, id_pages, offset_pages, range_pages};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::metadata::LayerMetadata;
use crate::service::{LayerClient, Statistic};
use crate::transport::RequestError;
use strategy::STRATEGY_CASCADE;

/// Largest page any plan requests, whatever the server declares.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Effective page size: the declared size (or the default), capped at
/// [`DEFAULT_PAGE_SIZE`] and at the caller's maximum. Never zero.
#[must_use]
pub fn page_size(metadata: &LayerMetadata, max_page_size: u64) -> u64 {
    metadata
        .declared_page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(DEFAULT_PAGE_SIZE)
        .min(max_page_size)
        .max(1)
}

/// An ordered set of pages covering a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Strategy that produced the pages.
    pub strategy: PagingStrategy,
    /// Records requested per page.
    pub page_size: u64,
    /// Pages in dispatch order.
    pub pages: Vec<PageDescriptor>,
}

impl Plan {
    fn single_page(page_size: u64) -> Self {
        Self {
            strategy: PagingStrategy::SinglePage,
            page_size,
            pages: vec![PageDescriptor::Layer],
        }
    }

    /// Number of planned pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if the plan has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Why a single strategy produced no plan.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The layer's capabilities rule the strategy out.
    #[error("{strategy} paging not applicable: {reason}")]
    NotApplicable {
        /// The skipped strategy.
        strategy: PagingStrategy,
        /// Missing capability.
        reason: &'static str,
    },

    /// A planning request failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The statistics response could not be interpreted.
    #[error("invalid statistics response: {message}")]
    InvalidStatistics {
        /// What was wrong with it.
        message: String,
    },
}

impl StrategyError {
    fn not_applicable(strategy: PagingStrategy, reason: &'static str) -> Self {
        Self::NotApplicable { strategy, reason }
    }
}

/// Errors raised when no plan can be built.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// Offset paging is unavailable and the layer has no identifier field.
    #[error("layer has no identifier field and does not support offset paging")]
    NoIdentifierField,

    /// Every applicable strategy failed; carries the last failure.
    #[error("all paging strategies failed")]
    AllStrategiesExhausted {
        /// Failure of the last strategy attempted.
        #[source]
        source: StrategyError,
    },
}

/// Builds paging plans for one layer.
#[derive(Debug, Clone)]
pub struct Planner {
    client: LayerClient,
    max_page_size: u64,
}

impl Planner {
    /// Creates a planner that never requests more than `max_page_size` records
    /// per page.
    #[must_use]
    pub fn new(client: LayerClient, max_page_size: u64) -> Self {
        Self {
            client,
            max_page_size: max_page_size.max(1),
        }
    }

    /// Plans the pages for a layer.
    ///
    /// # Errors
    ///
    /// Returns [`PlanningError`] when no strategy can produce a plan.
    #[instrument(skip_all, fields(layer = self.client.endpoint().layer()))]
    pub async fn plan(&self, metadata: &LayerMetadata) -> Result<Plan, PlanningError> {
        let page_size = page_size(metadata, self.max_page_size);

        if self.fits_in_one_page(metadata) {
            info!(count = ?metadata.total_count, "layer fits in a single page");
            return Ok(Plan::single_page(page_size));
        }

        let mut last_failure = None;
        for strategy in STRATEGY_CASCADE {
            match self.attempt(strategy, metadata, page_size).await {
                Ok(plan) => {
                    info!(
                        strategy = %plan.strategy,
                        pages = plan.len(),
                        page_size,
                        "built paging plan"
                    );
                    return Ok(plan);
                }
                Err(e @ StrategyError::NotApplicable { .. }) => {
                    debug!(%strategy, reason = %e, "skipping strategy");
                }
                Err(e) => {
                    warn!(%strategy, error = %e, "paging strategy failed, falling back");
                    last_failure = Some(e);
                }
            }
        }

        match last_failure {
            Some(source) => Err(PlanningError::AllStrategiesExhausted { source }),
            None => Err(PlanningError::NoIdentifierField),
        }
    }

    fn fits_in_one_page(&self, metadata: &LayerMetadata) -> bool {
        let Some(count) = metadata.total_count else {
            return false;
        };
        let declared = metadata.declared_page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        count < declared && count < self.max_page_size
    }

    async fn attempt(
        &self,
        strategy: PagingStrategy,
        metadata: &LayerMetadata,
        page_size: u64,
    ) -> Result<Plan, StrategyError> {
        match strategy {
            PagingStrategy::Offset => Self::offset_plan(metadata, page_size),
            PagingStrategy::StatisticsRange => self.statistics_plan(metadata, page_size).await,
            PagingStrategy::IdEnumeration => self.id_plan(metadata, page_size).await,
            PagingStrategy::SinglePage => Ok(Plan::single_page(page_size)),
        }
    }

    fn offset_plan(metadata: &LayerMetadata, page_size: u64) -> Result<Plan, StrategyError> {
        if !metadata.supports_offset_paging {
            return Err(StrategyError::not_applicable(
                PagingStrategy::Offset,
                "server does not support pagination",
            ));
        }
        let total = metadata.total_count.ok_or_else(|| {
            StrategyError::not_applicable(PagingStrategy::Offset, "total count unknown")
        })?;

        Ok(Plan {
            strategy: PagingStrategy::Offset,
            page_size,
            pages: offset_pages(total, page_size),
        })
    }

    async fn statistics_plan(
        &self,
        metadata: &LayerMetadata,
        page_size: u64,
    ) -> Result<Plan, StrategyError> {
        if !metadata.supports_statistics {
            return Err(StrategyError::not_applicable(
                PagingStrategy::StatisticsRange,
                "server does not support statistics",
            ));
        }
        let field = id_field(metadata, PagingStrategy::StatisticsRange)?;

        let response = self
            .client
            .statistics(field, &[Statistic::Min, Statistic::Max])
            .await?;
        let range = find_min_max(&response, field)
            .map_err(|message| StrategyError::InvalidStatistics { message })?;

        let Some(range) = range else {
            debug!(field, "statistics returned no range, requesting whole layer");
            return Ok(Plan::single_page(page_size));
        };

        debug!(field, %range, "identifier range from statistics");
        Ok(Plan {
            strategy: PagingStrategy::StatisticsRange,
            page_size,
            pages: range_pages(field, range, page_size),
        })
    }

    async fn id_plan(&self, metadata: &LayerMetadata, page_size: u64) -> Result<Plan, StrategyError> {
        let field = id_field(metadata, PagingStrategy::IdEnumeration)?;
        let ids = self.client.object_ids().await?;
        debug!(field, ids = ids.len(), "enumerated identifiers");

        Ok(Plan {
            strategy: PagingStrategy::IdEnumeration,
            page_size,
            pages: id_pages(field, &ids, page_size),
        })
    }
}

fn id_field(metadata: &LayerMetadata, strategy: PagingStrategy) -> Result<&str, StrategyError> {
    metadata
        .record_id_field
        .as_deref()
        .ok_or_else(|| StrategyError::not_applicable(strategy, "no identifier field"))
}
