//! End-to-end CLI tests for the featureservice binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::layer_server::{
    PageResponder, modern_layer, mount_count, mount_layer_info, mount_pages, mount_statistics,
    query_path, service_url,
};
use support::socket_guard::start_mock_server_or_skip;

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch every feature"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("featureservice"));
}

/// Test that a missing URL is a usage error.
#[test]
fn test_binary_requires_url() {
    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

/// Test that a URL that is not a feature service is rejected before any request.
#[test]
fn test_binary_rejects_non_service_url() {
    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg("https://example.com/index.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid service url"));
}

#[tokio::test]
async fn test_binary_prints_metadata() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(2000, true, true)).await;
    mount_count(&server, 77).await;

    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg(service_url(&server))
        .arg("--metadata")
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"record_id_field\": \"OBJECTID\""))
        .stdout(predicate::str::contains("\"total_count\": 77"));
}

#[tokio::test]
async fn test_binary_prints_plan() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(1000, true, false)).await;
    mount_count(&server, 2500).await;

    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg(service_url(&server))
        .arg("--plan")
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"strategy\": \"offset\""))
        .stdout(predicate::str::contains("\"offset\": 2000"));
}

#[tokio::test]
async fn test_binary_prints_statistics() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_statistics(&server, 1, 99).await;

    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg(service_url(&server))
        .arg("--statistics")
        .arg("OBJECTID")
        .arg("-q")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"min_OBJECTID\": 1"))
        .stdout(predicate::str::contains("\"max_OBJECTID\": 99"));
}

#[tokio::test]
async fn test_binary_writes_ndjson_to_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(100, true, false)).await;
    mount_count(&server, 250).await;
    mount_pages(&server, PageResponder::new(1..=250)).await;

    let tempdir = TempDir::new().unwrap();
    let output = tempdir.path().join("roads.ndjson");

    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg(service_url(&server))
        .arg("-o")
        .arg(&output)
        .arg("-c")
        .arg("3")
        .arg("-q")
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    let features: Vec<serde_json::Value> = written
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(features.len(), 250);
    assert_eq!(
        support::layer_server::collected_ids(&features),
        (1..=250).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_binary_exit_code_on_abort_is_nonzero() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_layer_info(&server, modern_layer(1000, true, false)).await;
    mount_count(&server, 10).await;
    Mock::given(method("GET"))
        .and(path(query_path()))
        .and(query_param("outFields", "*"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut cmd = Command::cargo_bin("featureservice").unwrap();
    cmd.arg(service_url(&server))
        .arg("--backoff-ms")
        .arg("1")
        .arg("-q")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("layer fetch aborted"));
}
