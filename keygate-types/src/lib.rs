//! Core type definitions for Keygate.
//!
//! This crate defines the types shared by every other Keygate crate:
//! - License codes and verified email identities (normalized newtypes)
//! - Persisted license and session records
//!
//! Storage, identity verification and the authorization flow live in their
//! own crates and only exchange these types.

mod ids;
mod record;

pub use ids::{Email, LicenseCode};
pub use record::{LicenseRecord, LicenseStatus, SessionRecord, MAX_DURATION_HOURS};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("license code must not be empty")]
    EmptyLicenseCode,

    #[error("email must not be empty")]
    EmptyEmail,

    #[error("invalid license status: {0}")]
    InvalidStatus(String),

    #[error("duration must be between 1 and {max} hours, got {0}", max = MAX_DURATION_HOURS)]
    InvalidDuration(i64),

    #[error("session expiry after {0} hours is out of range")]
    ExpiryOutOfRange(u32),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}
