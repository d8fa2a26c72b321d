//! Token introspection against an OAuth2 `tokeninfo` endpoint.
//!
//! The default configuration targets Google's
//! `GET /oauth2/v3/tokeninfo?access_token=<token>`, which answers with the
//! token's claims on success and a 4xx JSON error otherwise.

use async_trait::async_trait;
use keygate_types::Email;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{VerificationError, VerificationResult};
use crate::verifier::{IdentityVerifier, VerifiedIdentity};

/// Default outbound timeout (10 seconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Longest provider error detail kept in a [`VerificationError::Rejected`].
const MAX_DETAIL_LEN: usize = 200;

/// Introspection endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfoConfig {
    /// Full URL of the introspection endpoint.
    pub endpoint: String,
    /// Outbound request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TokenInfoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/oauth2/v3/tokeninfo".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Claims we read from a successful introspection response.
#[derive(Debug, Deserialize)]
struct TokenInfoClaims {
    email: Option<String>,
    /// Google sends this as the string `"true"`; other providers as a bool.
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
}

/// Error body of a rejected introspection call.
#[derive(Debug, Deserialize)]
struct TokenInfoErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Verifier that calls a `tokeninfo`-style endpoint over HTTPS.
pub struct TokenInfoVerifier {
    config: TokenInfoConfig,
    client: Client,
}

impl TokenInfoVerifier {
    /// Creates a verifier with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Client`] if the HTTP client cannot be built.
    pub fn new(config: TokenInfoConfig) -> VerificationResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| VerificationError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &TokenInfoConfig {
        &self.config
    }
}

#[async_trait]
impl IdentityVerifier for TokenInfoVerifier {
    async fn verify(&self, token: &str) -> VerificationResult<VerifiedIdentity> {
        let token = token.trim();
        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }

        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = rejection_detail(&body, status.canonical_reason());
            warn!(status = status.as_u16(), %detail, "identity provider rejected token");
            return Err(VerificationError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let claims: TokenInfoClaims = response.json().await.map_err(|e| {
            if e.is_timeout() {
                VerificationError::Timeout
            } else {
                VerificationError::MalformedResponse(e.to_string())
            }
        })?;

        if is_explicitly_unverified(claims.email_verified.as_ref()) {
            return Err(VerificationError::EmailNotVerified);
        }

        let email = claims
            .email
            .as_deref()
            .and_then(|raw| Email::parse(raw).ok())
            .ok_or(VerificationError::NoEmail)?;

        debug!(%email, "identity verified");
        Ok(VerifiedIdentity::now(email))
    }

    fn provider_name(&self) -> &'static str {
        "tokeninfo"
    }
}

fn classify_transport_error(err: reqwest::Error) -> VerificationError {
    if err.is_timeout() {
        warn!("identity provider timed out");
        VerificationError::Timeout
    } else {
        warn!(error = %err, "identity provider unreachable");
        VerificationError::Unreachable(err.to_string())
    }
}

fn rejection_detail(body: &str, reason: Option<&str>) -> String {
    let parsed = serde_json::from_str::<TokenInfoErrorBody>(body).ok();
    let detail = parsed
        .and_then(|b| b.error_description.or(b.error))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| reason.unwrap_or("token rejected").to_string());
    detail.chars().take(MAX_DETAIL_LEN).collect()
}

fn is_explicitly_unverified(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(verified)) => !verified,
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}
