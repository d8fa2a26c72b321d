//! Operator routes: key issuance and read-only listings.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use keygate_license::{issue_key, IssueError};
use keygate_storage::StorageError;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::api::{AdminErrorResponse, IssueKeyBody, IssuedKeyResponse, ADMIN_TOKEN_HEADER};
use crate::AppState;

fn admin_error(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(AdminErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };
    let supplied = headers
        .get(ADMIN_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if bool::from(supplied.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        warn!("admin request rejected");
        Err(admin_error(StatusCode::UNAUTHORIZED, "admin token required"))
    }
}

fn storage_failure(err: &StorageError) -> Response {
    warn!(error = %err, "admin store operation failed");
    admin_error(StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
}

pub(crate) async fn issue_key_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<IssueKeyBody>, JsonRejection>,
) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return admin_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let now = state.authorizer.now();
    let issued = state
        .authorizer
        .with_store(move |store| {
            issue_key(store, body.duration_hours, body.code.as_deref(), now)
        })
        .await;
    match issued {
        Ok(record) => (
            StatusCode::CREATED,
            Json(IssuedKeyResponse {
                key: record.code.to_string(),
                duration_hours: record.duration_hours,
            }),
        )
            .into_response(),
        Err(IssueError::Invalid(e)) => admin_error(StatusCode::BAD_REQUEST, e.to_string()),
        Err(IssueError::Storage(StorageError::Duplicate(code))) => {
            admin_error(StatusCode::CONFLICT, format!("license already exists: {code}"))
        }
        Err(IssueError::Storage(e)) => storage_failure(&e),
    }
}

pub(crate) async fn list_keys_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    match state.authorizer.with_store(|store| store.list_licenses()).await {
        Ok(licenses) => Json(licenses).into_response(),
        Err(e) => storage_failure(&e),
    }
}

pub(crate) async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = require_admin(&state, &headers) {
        return denied;
    }
    match state.authorizer.with_store(|store| store.list_sessions()).await {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => storage_failure(&e),
    }
}
