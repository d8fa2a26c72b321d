//! The verifier seam used by the authorization flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keygate_types::Email;

use crate::error::VerificationResult;

/// An email address the identity provider vouched for during this request.
///
/// Never persisted or cached; derive a fresh one for every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Normalized email claim.
    pub email: Email,
    /// When the provider confirmed it.
    pub verified_at: DateTime<Utc>,
}

impl VerifiedIdentity {
    /// Creates an identity verified now.
    #[must_use]
    pub fn now(email: Email) -> Self {
        Self {
            email,
            verified_at: Utc::now(),
        }
    }
}

/// Verifies bearer tokens against an identity provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolves `token` to a verified identity.
    async fn verify(&self, token: &str) -> VerificationResult<VerifiedIdentity>;

    /// Provider name for logs.
    fn provider_name(&self) -> &'static str;
}
