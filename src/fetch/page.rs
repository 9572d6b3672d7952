//! Decoded pages handed to the caller.

use serde_json::Value;

use crate::planner::PageDescriptor;

/// One successfully fetched page. The payload is passed through as decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePage {
    /// Position of the page in the plan.
    pub index: usize,
    /// Request parameters that produced this page.
    pub descriptor: PageDescriptor,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
    /// Decoded response body.
    pub payload: Value,
}

impl FeaturePage {
    /// The page's `features` array (empty when absent).
    #[must_use]
    pub fn features(&self) -> &[Value] {
        self.payload
            .get("features")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// Number of features on the page.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features().len()
    }

    /// Whether the server truncated the page to its own record limit.
    #[must_use]
    pub fn exceeded_transfer_limit(&self) -> bool {
        self.payload
            .get("exceededTransferLimit")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Consumes the page, returning its features.
    #[must_use]
    pub fn into_features(self) -> Vec<Value> {
        match self.payload {
            Value::Object(mut map) => match map.remove("features") {
                Some(Value::Array(features)) => features,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}
