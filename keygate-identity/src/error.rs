//! Error types for identity verification.

use thiserror::Error;

/// Result type for verification operations.
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Why a bearer token could not be turned into a verified email.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The token was empty; no provider call was made.
    #[error("token is empty")]
    EmptyToken,

    /// The provider answered with a non-success status.
    #[error("identity provider rejected token ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    /// The provider did not answer within the configured timeout.
    #[error("identity provider timed out")]
    Timeout,

    /// The provider answered 2xx with a body we could not parse.
    #[error("malformed identity provider response: {0}")]
    MalformedResponse(String),

    /// The provider accepted the token but returned no email claim.
    #[error("identity provider returned no email")]
    NoEmail,

    /// The provider reports the email as unverified.
    #[error("email address is not verified")]
    EmailNotVerified,

    /// The HTTP client could not be constructed.
    #[error("identity client configuration error: {0}")]
    Client(String),
}

impl VerificationError {
    /// Stable reason string for logs and API payloads.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyToken => "empty_token",
            Self::Rejected { .. } => "rejected",
            Self::Unreachable(_) => "unreachable",
            Self::Timeout => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::NoEmail => "no_email",
            Self::EmailNotVerified => "email_not_verified",
            Self::Client(_) => "client",
        }
    }
}
