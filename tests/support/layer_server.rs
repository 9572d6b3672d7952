//! Mock Feature Server layer backed by wiremock.
//!
//! [`PageResponder`] answers page queries from an in-memory id list, honoring
//! `resultOffset`/`resultRecordCount` and `OBJECTID >= a AND OBJECTID <= b`
//! where clauses, so tests can check that a plan returns every record once.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SERVICE_PATH: &str = "/arcgis/rest/services/Roads/FeatureServer";
pub const ID_FIELD: &str = "OBJECTID";

pub fn service_url(server: &MockServer) -> String {
    format!("{}{SERVICE_PATH}/0", server.uri())
}

pub fn layer_path() -> String {
    format!("{SERVICE_PATH}/0")
}

pub fn query_path() -> String {
    format!("{SERVICE_PATH}/0/query")
}

/// Layer description of a modern server.
pub fn modern_layer(max_record_count: u64, pagination: bool, statistics: bool) -> Value {
    json!({
        "currentVersion": 10.91,
        "name": "Roads",
        "geometryType": "esriGeometryPoint",
        "objectIdField": ID_FIELD,
        "maxRecordCount": max_record_count,
        "supportsStatistics": statistics,
        "advancedQueryCapabilities": {"supportsPagination": pagination}
    })
}

pub async fn mount_layer_info(server: &MockServer, info: Value) {
    Mock::given(method("GET"))
        .and(path(layer_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(info))
        .mount(server)
        .await;
}

pub async fn mount_count(server: &MockServer, count: u64) {
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("returnCountOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": count})))
        .mount(server)
        .await;
}

pub async fn mount_ids(server: &MockServer, ids: &[i64]) {
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("returnIdsOnly", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"objectIdFieldName": ID_FIELD, "objectIds": ids})),
        )
        .mount(server)
        .await;
}

pub async fn mount_statistics(server: &MockServer, min: i64, max: i64) {
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("outFields", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "features": [{"attributes": {"min_OBJECTID": min, "max_OBJECTID": max}}]
        })))
        .mount(server)
        .await;
}

/// Mounts the page responder for `outFields=*` queries. Returns its request counter.
pub async fn mount_pages(server: &MockServer, responder: PageResponder) -> Arc<AtomicUsize> {
    let calls = Arc::clone(&responder.calls);
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("outFields", "*"))
        .respond_with(responder)
        .mount(server)
        .await;
    calls
}

/// Serves pages from a fixed id list.
pub struct PageResponder {
    ids: Vec<i64>,
    calls: Arc<AtomicUsize>,
}

impl PageResponder {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn select(&self, request: &Request) -> Vec<i64> {
        let param = |key: &str| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(offset) = param("resultOffset").and_then(|v| v.parse::<usize>().ok()) {
            let count = param("resultRecordCount")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(self.ids.len());
            return self.ids.iter().copied().skip(offset).take(count).collect();
        }

        let where_clause = param("where").unwrap_or_default();
        let tokens: Vec<&str> = where_clause.split_whitespace().collect();
        if let [_, ">=", lo, "AND", _, "<=", hi] = tokens.as_slice() {
            let (lo, hi): (i64, i64) = (lo.parse().unwrap_or(i64::MIN), hi.parse().unwrap_or(i64::MAX));
            return self.ids.iter().copied().filter(|id| (lo..=hi).contains(id)).collect();
        }
        self.ids.clone()
    }
}

impl Respond for PageResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let features: Vec<Value> = self
            .select(request)
            .into_iter()
            .map(|id| json!({"attributes": {ID_FIELD: id}, "geometry": {"x": 0.0, "y": 0.0}}))
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "objectIdFieldName": ID_FIELD,
            "features": features
        }))
    }
}

/// Collects and sorts the `OBJECTID` of every feature in `pages`.
pub fn collected_ids<'a>(features: impl IntoIterator<Item = &'a Value>) -> Vec<i64> {
    let mut ids: Vec<i64> = features
        .into_iter()
        .filter_map(|f| f["attributes"][ID_FIELD].as_i64())
        .collect();
    ids.sort_unstable();
    ids
}
