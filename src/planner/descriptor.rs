//! Page descriptors: what one page request asks the server for.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Spatial reference requested for returned geometries (WGS 84).
const OUT_SPATIAL_REFERENCE: &str = "4326";

/// Where clause selecting every record.
const ALL_RECORDS: &str = "1=1";

/// Inclusive interval of record identifiers.
///
/// Constructed only through [`IdRange::new`], which enforces `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdRange {
    min: i64,
    max: i64,
}

impl IdRange {
    /// Creates a range, or `None` when `min > max`.
    #[must_use]
    pub fn new(min: i64, max: i64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub fn min(self) -> i64 {
        self.min
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub fn max(self) -> i64 {
        self.max
    }
}

/// Reads a record identifier: an integer, an integral float, or a numeric string.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn record_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Request parameters for exactly one page.
///
/// Immutable once planned. Retries reuse the same descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageDescriptor {
    /// The whole layer in a single request.
    Layer,

    /// Server-native paging by record offset.
    Offset {
        /// Records to skip.
        offset: u64,
        /// Records to return.
        count: u64,
    },

    /// Records whose identifier falls in an inclusive interval.
    IdRange {
        /// Identifier field name.
        field: String,
        /// Identifier bounds.
        range: IdRange,
    },
}

impl PageDescriptor {
    /// Query parameters for this page, in request order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let where_clause = match self {
            Self::Layer | Self::Offset { .. } => ALL_RECORDS.to_string(),
            Self::IdRange { field, range } => format!(
                "{field} >= {min} AND {field} <= {max}",
                min = range.min(),
                max = range.max()
            ),
        };

        let mut pairs = vec![
            ("where", where_clause),
            ("outFields", "*".to_string()),
            ("returnGeometry", "true".to_string()),
            ("outSR", OUT_SPATIAL_REFERENCE.to_string()),
            ("f", "json".to_string()),
        ];

        if let Self::Offset { offset, count } = self {
            pairs.push(("resultOffset", offset.to_string()));
            pairs.push(("resultRecordCount", count.to_string()));
        }

        pairs
    }
}

impl fmt::Display for PageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer => f.write_str("whole layer"),
            Self::Offset { offset, count } => write!(f, "offset {offset} (+{count})"),
            Self::IdRange { field, range } => write!(f, "{field} in {range}"),
        }
    }
}
