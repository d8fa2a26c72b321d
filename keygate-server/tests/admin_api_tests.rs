use std::sync::Arc;

use keygate_identity::StaticVerifier;
use keygate_license::Authorizer;
use keygate_server::{
    build_router, AdminErrorResponse, AppState, IssuedKeyResponse, ADMIN_TOKEN_HEADER,
};
use keygate_storage::MemoryStore;
use keygate_types::{LicenseRecord, LicenseStatus, SessionRecord};
use serde_json::json;

const ADMIN: &str = "operator-secret";

async fn spawn_admin_server(admin_token: Option<&str>) -> String {
    let authorizer = Authorizer::new(
        Arc::new(StaticVerifier::new().with_token("tok", "user@example.com")),
        Arc::new(MemoryStore::new()),
    );
    let mut state = AppState::new(authorizer);
    if let Some(token) = admin_token {
        state = state.with_admin_token(token);
    }
    let app = build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn issue_generated_key_and_list() {
    let base = spawn_admin_server(Some(ADMIN)).await;

    let resp = client()
        .post(format!("{}/admin/keys", base))
        .header(ADMIN_TOKEN_HEADER, ADMIN)
        .json(&json!({ "duration_hours": 24 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let issued: IssuedKeyResponse = resp.json().await.unwrap();
    assert_eq!(issued.duration_hours, 24);
    assert_eq!(issued.key.len(), 19);

    let resp = client()
        .get(format!("{}/admin/keys", base))
        .header(ADMIN_TOKEN_HEADER, ADMIN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let keys: Vec<LicenseRecord> = resp.json().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].code.as_str(), issued.key);
    assert_eq!(keys[0].status, LicenseStatus::Unused);
}

#[tokio::test]
async fn issued_key_activates_session_visible_to_admin() {
    let base = spawn_admin_server(None).await;

    let issued: IssuedKeyResponse = client()
        .post(format!("{}/admin/keys", base))
        .json(&json!({ "duration_hours": 6, "code": "launch-day" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(issued.key, "LAUNCH-DAY");

    let resp = client()
        .post(format!("{}/authorize", base))
        .json(&json!({ "token": "tok", "key": "launch-day" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let sessions: Vec<SessionRecord> = client()
        .get(format!("{}/admin/sessions", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].email.as_str(), "user@example.com");
    assert_eq!(sessions[0].source_key.as_ref().map(|c| c.as_str()), Some("LAUNCH-DAY"));
}

#[tokio::test]
async fn duplicate_code_conflicts() {
    let base = spawn_admin_server(None).await;
    for expected in [201, 409] {
        let resp = client()
            .post(format!("{}/admin/keys", base))
            .json(&json!({ "duration_hours": 1, "code": "SAME" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
    }
}

#[tokio::test]
async fn zero_duration_rejected() {
    let base = spawn_admin_server(None).await;
    let resp = client()
        .post(format!("{}/admin/keys", base))
        .json(&json!({ "duration_hours": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: AdminErrorResponse = resp.json().await.unwrap();
    assert!(body.error.contains("between 1 and"));
}

#[tokio::test]
async fn oversized_duration_rejected_and_nothing_stored() {
    let base = spawn_admin_server(None).await;
    let resp = client()
        .post(format!("{}/admin/keys", base))
        .json(&json!({ "duration_hours": u32::MAX, "code": "BIG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let listed: Vec<LicenseRecord> = client()
        .get(format!("{}/admin/keys", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn malformed_issue_body_is_json_bad_request() {
    let base = spawn_admin_server(None).await;
    let resp = client()
        .post(format!("{}/admin/keys", base))
        .json(&json!({ "duration_hours": "a day" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: AdminErrorResponse = resp.json().await.unwrap();
    assert!(!body.error.is_empty());
}

#[tokio::test]
async fn admin_routes_require_token_when_configured() {
    let base = spawn_admin_server(Some(ADMIN)).await;

    let resp = client()
        .get(format!("{}/admin/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client()
        .post(format!("{}/admin/keys", base))
        .header(ADMIN_TOKEN_HEADER, "wrong")
        .json(&json!({ "duration_hours": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client()
        .get(format!("{}/admin/keys", base))
        .header(ADMIN_TOKEN_HEADER, "operator")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client()
        .get(format!("{}/admin/keys", base))
        .header(ADMIN_TOKEN_HEADER, ADMIN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
