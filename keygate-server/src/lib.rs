//! HTTP API for the Keygate license service.
//!
//! Routes:
//! - `POST /authorize`: verify a token, reuse or create a session
//! - `POST /status`: read-only license state for a token
//! - `POST /admin/keys`, `GET /admin/keys`, `GET /admin/sessions`: operator surface
//! - `GET /health`

mod admin;
mod api;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use keygate_license::{AuthorizeRequest, Authorizer};

pub use api::{
    AdminErrorResponse, AuthorizeBody, AuthorizeResponse, HealthResponse, IssueKeyBody,
    IssuedKeyResponse, StatusBody, StatusResponse, ADMIN_TOKEN_HEADER, INVALID_REQUEST_KIND,
};

/// Shared state behind every route.
pub struct AppState {
    pub authorizer: Authorizer,
    /// When set, admin routes require it in the `x-admin-token` header.
    pub admin_token: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn new(authorizer: Authorizer) -> Self {
        Self {
            authorizer,
            admin_token: None,
        }
    }

    #[must_use]
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

async fn authorize_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body: AuthorizeBody = match api::decode_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let request = AuthorizeRequest {
        token: body.token,
        key: body.key,
    };
    match state.authorizer.authorize(&request).await {
        Ok(auth) => (StatusCode::OK, Json(AuthorizeResponse::granted(&auth))).into_response(),
        Err(err) => api::error_response(&err),
    }
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body: StatusBody = match api::decode_body(body) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match state.authorizer.status(body.token.as_deref()).await {
        Ok(report) => (StatusCode::OK, Json(StatusResponse::from(&report))).into_response(),
        Err(err) => api::error_response(&err),
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/authorize", post(authorize_handler))
        .route("/status", post(status_handler))
        .route("/admin/keys", post(admin::issue_key_handler).get(admin::list_keys_handler))
        .route("/admin/sessions", get(admin::list_sessions_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
