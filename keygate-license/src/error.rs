//! Error types for authorization and issuance.

use keygate_identity::VerificationError;
use keygate_storage::{RedeemError, StorageError};
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthorizeResult<T> = Result<T, AuthorizeError>;

/// Result type for key issuance.
pub type IssueResult<T> = Result<T, IssueError>;

/// Terminal failures of an authorization request.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// The request carried no token.
    #[error("token required")]
    TokenRequired,

    /// The identity provider refused or could not check the token.
    #[error("identity verification failed: {0}")]
    IdentityVerificationFailed(#[from] VerificationError),

    /// No valid session and no key supplied.
    #[error("license key required")]
    NeedsKey,

    /// The supplied key does not exist.
    #[error("invalid key")]
    InvalidKey,

    /// The supplied key was redeemed before.
    #[error("key already used")]
    KeyAlreadyUsed,

    /// Storage failed; the request can be retried as a whole.
    #[error("store unavailable: {0}")]
    Store(#[from] StorageError),
}

impl AuthorizeError {
    /// Stable machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TokenRequired => "token_required",
            Self::IdentityVerificationFailed(_) => "identity_verification_failed",
            Self::NeedsKey => "needs_key",
            Self::InvalidKey => "invalid_key",
            Self::KeyAlreadyUsed => "key_already_used",
            Self::Store(_) => "store_unavailable",
        }
    }

    /// Returns true if the client should prompt the user for a license key.
    #[must_use]
    pub fn needs_key(&self) -> bool {
        matches!(self, Self::NeedsKey)
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::IdentityVerificationFailed(e) => {
                matches!(e, VerificationError::Timeout | VerificationError::Unreachable(_))
            }
            _ => false,
        }
    }
}

impl From<RedeemError> for AuthorizeError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::NotFound => Self::InvalidKey,
            RedeemError::AlreadyUsed => Self::KeyAlreadyUsed,
            RedeemError::Storage(e) => Self::Store(e),
        }
    }
}

/// Failures of administrative key issuance.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The requested duration or code is unusable.
    #[error("invalid license: {0}")]
    Invalid(#[from] keygate_types::Error),

    /// Storage failed, including duplicate codes.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
