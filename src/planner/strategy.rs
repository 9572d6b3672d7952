//! Pure page builders, one per paging strategy.
//!
//! Each builder turns already-fetched facts (a count, an id range, an id list)
//! into descriptors that tile the layer with no gaps and no overlap.

use std::fmt;

use serde::Serialize;

use super::descriptor::{IdRange, PageDescriptor};

/// How a plan enumerates the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingStrategy {
    /// The layer fits in one request.
    SinglePage,
    /// Server-native `resultOffset`/`resultRecordCount` paging.
    Offset,
    /// Identifier intervals derived from `min`/`max` statistics.
    StatisticsRange,
    /// Identifier intervals cut from the full id list.
    IdEnumeration,
}

impl fmt::Display for PagingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePage => f.write_str("single page"),
            Self::Offset => f.write_str("offset"),
            Self::StatisticsRange => f.write_str("statistics range"),
            Self::IdEnumeration => f.write_str("id enumeration"),
        }
    }
}

/// Strategies in the order the planner tries them.
pub(super) const STRATEGY_CASCADE: [PagingStrategy; 3] = [
    PagingStrategy::Offset,
    PagingStrategy::StatisticsRange,
    PagingStrategy::IdEnumeration,
];

/// `ceil(total / page_size)` offset pages. The last page's count is trimmed
/// so `offset + count` never passes `total`.
#[must_use]
pub fn offset_pages(total: u64, page_size: u64) -> Vec<PageDescriptor> {
    let page_size = page_size.max(1);
    (0..total.div_ceil(page_size))
        .map(|i| {
            let offset = i * page_size;
            PageDescriptor::Offset {
                offset,
                count: page_size.min(total - offset),
            }
        })
        .collect()
}

/// `max(ceil((max - min) / page_size), 1)` contiguous identifier intervals.
///
/// Servers reject a final upper bound past the real maximum, so the last
/// interval is clamped to `range.max()`; earlier intervals are not.
#[must_use]
pub fn range_pages(field: &str, range: IdRange, page_size: u64) -> Vec<PageDescriptor> {
    let size = i128::from(page_size.max(1));
    let min = i128::from(range.min());
    let max = i128::from(range.max());
    let span = max - min;
    let pages = ((span + size - 1) / size).max(1);

    (0..pages)
        .filter_map(|i| {
            let lo = min + i * size;
            let hi = if i == pages - 1 {
                max
            } else {
                min + (i + 1) * size - 1
            };
            let range = IdRange::new(i64::try_from(lo).ok()?, i64::try_from(hi).ok()?)?;
            Some(PageDescriptor::IdRange {
                field: field.to_string(),
                range,
            })
        })
        .collect()
}

/// `ceil(ids.len() / page_size)` intervals, one per contiguous slice of the
/// sorted id list, bounded by the slice's first and last id.
#[must_use]
pub fn id_pages(field: &str, sorted_ids: &[i64], page_size: u64) -> Vec<PageDescriptor> {
    let chunk = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    sorted_ids
        .chunks(chunk)
        .filter_map(|slice| {
            let range = IdRange::new(*slice.first()?, *slice.last()?)?;
            Some(PageDescriptor::IdRange {
                field: field.to_string(),
                range,
            })
        })
        .collect()
}
