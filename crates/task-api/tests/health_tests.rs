//! Health, readiness and metrics endpoint tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use task_api::services::InMemoryPrincipalStore;
use task_api_test_utils::TestApiServer;

#[tokio::test]
async fn test_health_returns_ok() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_ready_when_store_reachable() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

#[tokio::test]
async fn test_not_ready_when_store_unavailable() -> Result<()> {
    let store = Arc::new(InMemoryPrincipalStore::failing());
    let server = TestApiServer::builder().store(store.clone()).spawn().await?;

    let response = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["error"], "Service dependencies unavailable");

    store.set_available(true);
    let recovered = reqwest::get(format!("{}/ready", server.url())).await?;
    assert_eq!(recovered.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_login_during_store_outage_is_generic_500() -> Result<()> {
    let server = TestApiServer::builder()
        .store(Arc::new(InMemoryPrincipalStore::failing()))
        .spawn()
        .await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/login", server.url()))
        .json(&serde_json::json!({"identifier": "alice", "password": "secret1"}))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "An internal database error occurred");

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/nothing-here", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
