//! Integration tests for strategy selection against a mock server.

use featureservice_core::{
    FeatureService, PageDescriptor, PagingStrategy, PlanningError, ServiceError, ServiceOptions,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::layer_server::{
    modern_layer, mount_count, mount_ids, mount_layer_info, mount_statistics, query_path,
    service_url,
};
use support::socket_guard::start_mock_server_or_skip;

fn bounds(pages: &[PageDescriptor]) -> Vec<(i64, i64)> {
    pages
        .iter()
        .map(|p| match p {
            PageDescriptor::IdRange { range, .. } => (range.min(), range.max()),
            other => panic!("expected id range, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_offset_plan() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(1000, true, true)).await;
    mount_count(&server, 2000).await;

    let service = FeatureService::new(&service_url(&server), ServiceOptions::default()).unwrap();
    let plan = service.plan().await.unwrap();

    assert_eq!(plan.strategy, PagingStrategy::Offset);
    assert_eq!(
        plan.pages,
        vec![
            PageDescriptor::Offset {
                offset: 0,
                count: 1000
            },
            PageDescriptor::Offset {
                offset: 1000,
                count: 1000
            },
        ]
    );
}

#[tokio::test]
async fn test_statistics_plan() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(500, false, true)).await;
    mount_count(&server, 1800).await;
    mount_statistics(&server, 0, 2000).await;

    let service = FeatureService::new(&service_url(&server), ServiceOptions::default()).unwrap();
    let plan = service.plan().await.unwrap();

    assert_eq!(plan.strategy, PagingStrategy::StatisticsRange);
    assert_eq!(plan.page_size, 500);
    assert_eq!(
        bounds(&plan.pages),
        vec![(0, 499), (500, 999), (1000, 1499), (1500, 2000)]
    );
}

#[tokio::test]
async fn test_statistics_error_falls_back_to_ids() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(2, false, true)).await;
    mount_count(&server, 5).await;
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("outFields", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 400, "message": "Unable to perform query", "details": []}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_ids(&server, &[9, 3, 5, 1, 7, 3]).await;

    let service = FeatureService::new(&service_url(&server), ServiceOptions::default()).unwrap();
    let plan = service.plan().await.unwrap();

    assert_eq!(plan.strategy, PagingStrategy::IdEnumeration);
    assert_eq!(bounds(&plan.pages), vec![(1, 3), (5, 7), (9, 9)]);
}

#[tokio::test]
async fn test_caller_page_size_ceiling() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(1000, true, false)).await;
    mount_count(&server, 450).await;

    let options = ServiceOptions {
        max_page_size: 100,
        ..ServiceOptions::default()
    };
    let service = FeatureService::new(&service_url(&server), options).unwrap();
    let plan = service.plan().await.unwrap();

    assert_eq!(plan.strategy, PagingStrategy::Offset);
    assert_eq!(plan.page_size, 100);
    assert_eq!(plan.len(), 5);
    assert_eq!(
        plan.pages.last(),
        Some(&PageDescriptor::Offset {
            offset: 400,
            count: 50
        })
    );
}

#[tokio::test]
async fn test_no_identifier_field() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(
        &server,
        json!({"currentVersion": 10.5, "maxRecordCount": 1000, "supportsStatistics": true}),
    )
    .await;
    mount_count(&server, 5000).await;

    let service = FeatureService::new(&service_url(&server), ServiceOptions::default()).unwrap();
    assert!(matches!(
        service.plan().await,
        Err(ServiceError::Planning(PlanningError::NoIdentifierField))
    ));
}

#[tokio::test]
async fn test_all_strategies_exhausted() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(1000, false, true)).await;
    mount_count(&server, 5000).await;
    Mock::given(method("GET"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(10)
        .mount(&server)
        .await;

    let service = FeatureService::new(&service_url(&server), ServiceOptions::default()).unwrap();
    assert!(matches!(
        service.plan().await,
        Err(ServiceError::Planning(PlanningError::AllStrategiesExhausted { .. }))
    ));
}
