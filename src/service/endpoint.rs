//! Request URL construction for one layer of a service.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::planner::PageDescriptor;

/// Aggregate statistic types supported by the `outStatistics` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Mean value.
    Avg,
    /// Standard deviation.
    Stddev,
    /// Non-null value count.
    Count,
    /// Sum of values.
    Sum,
}

impl Statistic {
    /// Returns the wire name of the statistic.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Avg => "avg",
            Self::Stddev => "stddev",
            Self::Count => "count",
            Self::Sum => "sum",
        }
    }

    /// Output attribute name the server is asked to use for this statistic.
    #[must_use]
    pub fn out_field_name(self, field: &str) -> String {
        format!("{}_{field}", self.as_str())
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "avg" => Ok(Self::Avg),
            "stddev" => Ok(Self::Stddev),
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            other => Err(format!("unknown statistic `{other}`")),
        }
    }
}

/// Builds every URL the crate requests for a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEndpoint {
    server: Url,
    layer: u32,
}

impl LayerEndpoint {
    /// Creates an endpoint for `layer` under the given server root.
    #[must_use]
    pub fn new(server: Url, layer: u32) -> Self {
        Self { server, layer }
    }

    /// Returns the server root.
    #[must_use]
    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Returns the layer index.
    #[must_use]
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// `<server>?f=json`
    #[must_use]
    pub fn service_info_url(&self) -> Url {
        let mut url = self.with_path(&[]);
        url.query_pairs_mut().append_pair("f", "json");
        url
    }

    /// `<server>/<layer>?f=json`
    #[must_use]
    pub fn layer_info_url(&self) -> Url {
        let layer = self.layer.to_string();
        let mut url = self.with_path(&[&layer]);
        url.query_pairs_mut().append_pair("f", "json");
        url
    }

    /// Total record count query.
    #[must_use]
    pub fn count_url(&self) -> Url {
        let mut url = self.query_path();
        url.query_pairs_mut()
            .append_pair("where", "1=1")
            .append_pair("returnCountOnly", "true")
            .append_pair("f", "json");
        url
    }

    /// Object id enumeration query.
    #[must_use]
    pub fn ids_url(&self) -> Url {
        let mut url = self.query_path();
        url.query_pairs_mut()
            .append_pair("where", "1=1")
            .append_pair("returnIdsOnly", "true")
            .append_pair("f", "json");
        url
    }

    /// Aggregate statistics query over `field`.
    #[must_use]
    pub fn statistics_url(&self, field: &str, stats: &[Statistic]) -> Url {
        let definitions: Vec<_> = stats
            .iter()
            .map(|stat| {
                json!({
                    "statisticType": stat.as_str(),
                    "onStatisticField": field,
                    "outStatisticFieldName": stat.out_field_name(field),
                })
            })
            .collect();

        let mut url = self.query_path();
        url.query_pairs_mut()
            .append_pair("f", "json")
            .append_pair("outFields", "")
            .append_pair("outStatistics", &serde_json::Value::from(definitions).to_string());
        url
    }

    /// Query for one page of features.
    #[must_use]
    pub fn page_url(&self, descriptor: &PageDescriptor) -> Url {
        let mut url = self.query_path();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in descriptor.query_pairs() {
                pairs.append_pair(key, &value);
            }
        }
        url
    }

    fn query_path(&self) -> Url {
        let layer = self.layer.to_string();
        self.with_path(&[&layer, "query"])
    }

    fn with_path(&self, segments: &[&str]) -> Url {
        let mut url = self.server.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
