//! Full stack: tokeninfo verifier against a mock provider, SQLite on disk.

use std::sync::Arc;

use keygate_identity::{TokenInfoConfig, TokenInfoVerifier};
use keygate_license::{issue_key, Authorizer};
use keygate_server::{build_router, AppState, AuthorizeResponse, StatusResponse};
use keygate_storage::SqliteStore;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_provider() -> MockServer {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .and(query_param("access_token", "google-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "carol@example.com",
            "email_verified": "true"
        })))
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/tokeninfo"))
        .and(query_param("access_token", "expired-token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_token",
            "error_description": "Token expired or revoked"
        })))
        .mount(&provider)
        .await;
    provider
}

#[tokio::test]
async fn activation_flow_against_mock_provider() {
    let provider = mock_provider().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("keygate.db")).unwrap());
    issue_key(store.as_ref(), 24, Some("ABC123"), chrono::Utc::now()).unwrap();

    let verifier = TokenInfoVerifier::new(TokenInfoConfig {
        endpoint: format!("{}/tokeninfo", provider.uri()),
        timeout_ms: 2_000,
    })
    .unwrap();
    let app = build_router(Arc::new(AppState::new(Authorizer::new(
        Arc::new(verifier),
        store,
    ))));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();

    // bad token: 401 before anything else
    let resp = client
        .post(format!("{}/authorize", base))
        .json(&json!({ "token": "expired-token", "key": "ABC123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: AuthorizeResponse = resp.json().await.unwrap();
    assert!(body.detail.unwrap().contains("Token expired or revoked"));

    // no session yet
    let status: StatusResponse = client
        .post(format!("{}/status", base))
        .json(&json!({ "token": "google-token" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!status.has_license);
    assert_eq!(status.email, "carol@example.com");

    // redeem
    let resp = client
        .post(format!("{}/authorize", base))
        .json(&json!({ "token": "google-token", "key": "abc123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: AuthorizeResponse = resp.json().await.unwrap();
    let hours = body.hours_remaining.unwrap();
    assert!((hours - 24.0).abs() < 0.1);

    // returning user, no key needed
    let resp = client
        .post(format!("{}/authorize", base))
        .json(&json!({ "token": "google-token" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let status: StatusResponse = client
        .post(format!("{}/status", base))
        .json(&json!({ "token": "google-token" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.has_license);
}
