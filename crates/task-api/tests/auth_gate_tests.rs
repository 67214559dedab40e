//! Authentication and role gate integration tests.
//!
//! Drives a real server through the header gate, the download gate and the
//! role-gated groups with tokens issued by the server and hand-built ones.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use common::types::Role;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use task_api_test_utils::{TestApiServer, TestTokenBuilder, WRONG_JWT_SECRET};

async fn get_with_token(server: &TestApiServer, path: &str, token: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .get(format!("{}{}", server.url(), path))
        .bearer_auth(token)
        .send()
        .await?)
}

async fn error_message(response: reqwest::Response) -> Result<String> {
    let body: Value = response.json().await?;
    Ok(body["error"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_issued_staff_token_verifies_with_staff_role() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let token = server.token_for(Role::Staff);

    let response = get_with_token(&server, "/api/auth/verify", &token).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["role"], "staff");
    assert_eq!(body["user"]["username"], "tester");

    Ok(())
}

#[tokio::test]
async fn test_revoked_token_is_rejected_while_still_signed_and_live() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let token = server.token_for(Role::Manager);
    let client = reqwest::Client::new();

    let logout = client
        .post(format!("{}/api/auth/logout", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(logout.status(), StatusCode::OK);
    let body: Value = logout.json().await?;
    assert_eq!(body["message"], "Successfully logged out");

    // Codec alone still accepts it
    assert!(server.codec().verify(&token).is_ok());

    let response = get_with_token(&server, "/api/auth/verify", &token).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await?, "Token has been revoked");

    Ok(())
}

#[tokio::test]
async fn test_expired_token_rejected_and_never_recorded() -> Result<()> {
    let server = TestApiServer::builder()
        .var("TOKEN_TTL_SECONDS", "1")
        .spawn()
        .await?;
    let token = server.token_for(Role::Staff);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let response = get_with_token(&server, "/api/auth/verify", &token).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: token is expired"
    );
    assert_eq!(server.registry().count(), 0);
    assert!(!server.registry().is_revoked(&token));

    Ok(())
}

#[tokio::test]
async fn test_garbage_token_rejected_as_invalid() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = get_with_token(&server, "/api/auth/verify", "eyJhbGciOiJub25lIn0.e30.").await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(error_message(response).await?.starts_with("Invalid token: "));

    Ok(())
}

#[tokio::test]
async fn test_token_signed_with_other_secret_rejected() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let token = TestTokenBuilder::new().sign_with(WRONG_JWT_SECRET);

    let response = get_with_token(&server, "/api/auth/verify", &token).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_message(response).await?,
        "Invalid token: signature is invalid"
    );

    Ok(())
}

#[tokio::test]
async fn test_claim_shape_failures_have_distinct_messages() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let no_subject = TestTokenBuilder::new().without_subject().sign();
    let empty_subject = TestTokenBuilder::new().for_user("").sign();
    let numeric_subject = TestTokenBuilder::new()
        .with_raw_subject(serde_json::json!(42))
        .sign();
    let unknown_role = TestTokenBuilder::new().with_role("owner").sign();
    let no_role = TestTokenBuilder::new().without_role().sign();

    for token in [no_subject, empty_subject, numeric_subject] {
        let response = get_with_token(&server, "/api/auth/verify", &token).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(response).await?, "Invalid user ID in token");
    }

    for token in [unknown_role, no_role] {
        let response = get_with_token(&server, "/api/auth/verify", &token).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(response).await?, "Invalid role in token");
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_token_rejected_with_challenge() -> Result<()> {
    let server = TestApiServer::spawn().await?;

    let response = reqwest::get(format!("{}/api/auth/verify", server.url())).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response
        .headers()
        .get("www-authenticate")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(challenge.as_deref(), Some("Bearer realm=\"task-api\""));
    assert_eq!(
        error_message(response).await?,
        "Authorization header required"
    );

    Ok(())
}

#[tokio::test]
async fn test_staff_role_gating() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;
    let token = server.token_for(Role::Staff);

    let manager_only = get_with_token(&server, "/api/manager/whoami", &token).await?;
    assert_eq!(manager_only.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_message(manager_only).await?, "forbidden");

    let staff = get_with_token(&server, "/api/staff/whoami", &token).await?;
    assert_eq!(staff.status(), StatusCode::OK);
    let body: Value = staff.json().await?;
    assert_eq!(body["role"], "staff");

    Ok(())
}

#[tokio::test]
async fn test_role_groups_admit_expected_roles() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;

    let cases = [
        ("/api/admin/whoami", Role::Admin, StatusCode::OK),
        ("/api/admin/whoami", Role::Manager, StatusCode::FORBIDDEN),
        ("/api/admin/whoami", Role::Staff, StatusCode::FORBIDDEN),
        ("/api/manager/whoami", Role::Admin, StatusCode::OK),
        ("/api/manager/whoami", Role::Manager, StatusCode::OK),
        ("/api/manager/whoami", Role::Staff, StatusCode::FORBIDDEN),
        ("/api/staff/whoami", Role::Admin, StatusCode::OK),
        ("/api/staff/whoami", Role::Manager, StatusCode::OK),
        ("/api/staff/whoami", Role::Staff, StatusCode::OK),
    ];

    for (path, role, expected) in cases {
        let token = server.token_for(role);
        let response = get_with_token(&server, path, &token).await?;
        assert_eq!(response.status(), expected, "{} as {}", path, role);
    }

    Ok(())
}

#[tokio::test]
async fn test_role_group_requires_authentication_first() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;

    let response = reqwest::get(format!("{}/api/admin/whoami", server.url())).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        error_message(response).await?,
        "Authorization header required"
    );

    Ok(())
}

#[tokio::test]
async fn test_download_accepts_query_token_like_header() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;
    let token = server.token_for(Role::Manager);

    let via_query = reqwest::get(format!(
        "{}/api/attachments/42/download?token={}",
        server.url(),
        token
    ))
    .await?;
    let via_header = get_with_token(&server, "/api/attachments/42/download", &token).await?;

    assert_eq!(via_query.status(), StatusCode::OK);
    assert_eq!(via_header.status(), StatusCode::OK);

    let query_body: Value = via_query.json().await?;
    let header_body: Value = via_header.json().await?;
    assert_eq!(query_body, header_body);
    assert_eq!(query_body["attachment_id"], "42");

    Ok(())
}

#[tokio::test]
async fn test_download_query_token_is_checked_for_revocation() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;
    let token = server.token_for(Role::Staff);

    let logout = reqwest::Client::new()
        .post(format!("{}/api/auth/logout", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(logout.status(), StatusCode::OK);

    let response = reqwest::get(format!(
        "{}/api/attachments/42/download?token={}",
        server.url(),
        token
    ))
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(response).await?, "Token has been revoked");

    Ok(())
}

#[tokio::test]
async fn test_header_gated_group_ignores_query_token() -> Result<()> {
    let server = TestApiServer::spawn_with_echo_routes().await?;
    let token = server.token_for(Role::Admin);

    let response = reqwest::get(format!(
        "{}/api/staff/whoami?token={}",
        server.url(),
        token
    ))
    .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
