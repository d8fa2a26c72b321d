//! In-process verifier backed by a fixed token table.

use async_trait::async_trait;
use keygate_types::Email;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{VerificationError, VerificationResult};
use crate::verifier::{IdentityVerifier, VerifiedIdentity};

/// Verifier that accepts only the tokens it was built with.
///
/// Used for local development and as a test double; it also counts how many
/// times it was asked so callers can assert that no verification happened.
#[derive(Debug, Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StaticVerifier {
    /// Creates a verifier with no known tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` as belonging to `email`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }

    /// Number of `verify` calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> VerificationResult<VerifiedIdentity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let token = token.trim();
        if token.is_empty() {
            return Err(VerificationError::EmptyToken);
        }
        let email = self
            .tokens
            .get(token)
            .ok_or_else(|| VerificationError::Rejected {
                status: 401,
                detail: "unknown token".to_string(),
            })?;
        let email = Email::parse(email).map_err(|_| VerificationError::NoEmail)?;
        Ok(VerifiedIdentity::now(email))
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}
