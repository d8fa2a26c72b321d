//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be turned back into a record.
    #[error("invalid data: {0}")]
    InvalidData(#[from] keygate_types::Error),

    /// A license with this code already exists.
    #[error("license already exists: {0}")]
    Duplicate(String),

    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// The blocking task running a store call did not complete.
    #[error("store task failed: {0}")]
    Task(String),
}

/// Why a license could not be redeemed.
#[derive(Debug, Error)]
pub enum RedeemError {
    /// No license with this code exists.
    #[error("license key not found")]
    NotFound,

    /// The license was redeemed before.
    #[error("license key already used")]
    AlreadyUsed,

    /// The store failed; nothing was changed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for RedeemError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err))
    }
}

impl From<keygate_types::Error> for RedeemError {
    fn from(err: keygate_types::Error) -> Self {
        Self::Storage(StorageError::InvalidData(err))
    }
}
