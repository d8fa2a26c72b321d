//! Request and response bodies, and the mapping from errors to HTTP.

use axum::{
    body::Bytes,
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use keygate_license::{Authorization, AuthorizeError, Grant, StatusReport};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Header carrying the operator token for admin routes.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Kind reported when a request body cannot be decoded.
pub const INVALID_REQUEST_KIND: &str = "invalid_request";

/// `POST /authorize` body. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizeBody {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

/// `POST /status` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of every `/authorize` answer and of `/status` failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_remaining: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable failure kind, e.g. `key_already_used`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_key: Option<bool>,
}

impl AuthorizeResponse {
    pub fn granted(auth: &Authorization) -> Self {
        let message = match &auth.grant {
            Grant::ExistingSession => format!("Welcome back, {}", auth.email),
            Grant::Activated { .. } => "License key activated".to_string(),
        };
        Self {
            authorized: true,
            email: Some(auth.email.to_string()),
            hours_remaining: Some(auth.hours_remaining),
            expires_at: Some(auth.expires_at),
            message: Some(message),
            ..Self::default()
        }
    }

    pub fn denied(err: &AuthorizeError) -> Self {
        let detail = match err {
            AuthorizeError::IdentityVerificationFailed(source) => Some(source.to_string()),
            _ => None,
        };
        let error = match err {
            AuthorizeError::IdentityVerificationFailed(_) => "identity verification failed".to_string(),
            AuthorizeError::Store(_) => "store unavailable".to_string(),
            other => other.to_string(),
        };
        Self {
            authorized: false,
            error: Some(error),
            kind: Some(err.kind().to_string()),
            detail,
            needs_key: err.needs_key().then_some(true),
            ..Self::default()
        }
    }

    /// Body for a request whose JSON could not be decoded.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            authorized: false,
            error: Some("invalid request body".to_string()),
            kind: Some(INVALID_REQUEST_KIND.to_string()),
            detail: Some(detail.into()),
            ..Self::default()
        }
    }
}

/// `POST /status` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub has_license: bool,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_remaining: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&StatusReport> for StatusResponse {
    fn from(report: &StatusReport) -> Self {
        Self {
            has_license: report.has_license(),
            email: report.email.to_string(),
            hours_remaining: report.hours_remaining,
            expires_at: report.session.as_ref().map(|s| s.expires_at),
        }
    }
}

/// `POST /admin/keys` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueKeyBody {
    pub duration_hours: u32,
    /// Explicit code; a random one is generated when absent.
    #[serde(default)]
    pub code: Option<String>,
}

/// `POST /admin/keys` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedKeyResponse {
    pub key: String,
    pub duration_hours: u32,
}

/// Error body of admin routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// HTTP status for each failure kind.
pub(crate) fn status_for(err: &AuthorizeError) -> StatusCode {
    match err {
        AuthorizeError::TokenRequired => StatusCode::BAD_REQUEST,
        AuthorizeError::IdentityVerificationFailed(_) | AuthorizeError::NeedsKey => {
            StatusCode::UNAUTHORIZED
        }
        AuthorizeError::InvalidKey | AuthorizeError::KeyAlreadyUsed => StatusCode::FORBIDDEN,
        AuthorizeError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub(crate) fn error_response(err: &AuthorizeError) -> Response {
    (status_for(err), Json(AuthorizeResponse::denied(err))).into_response()
}

/// Decodes a JSON request body regardless of its content type.
///
/// An empty body decodes as `T::default()`, so a bare request reaches the
/// authorizer and fails there as "token required".
pub(crate) fn decode_body<T>(body: Result<Bytes, BytesRejection>) -> Result<T, Response>
where
    T: DeserializeOwned + Default,
{
    let bytes = body.map_err(|rejection| malformed_response(rejection.body_text()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|e| malformed_response(e.to_string()))
}

fn malformed_response(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(AuthorizeResponse::malformed(detail))).into_response()
}
