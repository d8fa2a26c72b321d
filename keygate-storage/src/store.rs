//! Storage traits injected into the authorization flow.

use chrono::{DateTime, Utc};
use keygate_types::{Email, LicenseCode, LicenseRecord, SessionRecord};

use crate::error::{RedeemError, StorageResult};

/// Table of one-time license keys.
pub trait LicenseStore: Send + Sync {
    /// Inserts a newly issued license.
    ///
    /// Fails with [`StorageError::Duplicate`](crate::StorageError::Duplicate)
    /// if the code exists.
    fn insert_license(&self, record: &LicenseRecord) -> StorageResult<()>;

    /// Looks up a license by its normalized code.
    fn get_license(&self, code: &LicenseCode) -> StorageResult<Option<LicenseRecord>>;

    /// Lists all licenses, oldest first.
    fn list_licenses(&self) -> StorageResult<Vec<LicenseRecord>>;

    /// Marks an unused license as used by `by` and returns its duration.
    ///
    /// The read and the status change happen in one transaction.
    fn redeem(
        &self,
        code: &LicenseCode,
        by: &Email,
        now: DateTime<Utc>,
    ) -> Result<u32, RedeemError>;
}

/// Table of sessions, one per verified email.
pub trait SessionStore: Send + Sync {
    /// Returns the session for `email`, expired or not.
    fn get_session(&self, email: &Email) -> StorageResult<Option<SessionRecord>>;

    /// Replaces any session for `record.email` with `record`.
    fn put_session(&self, record: &SessionRecord) -> StorageResult<()>;

    /// Deletes the session for `email`. Returns true if one existed.
    fn delete_session(&self, email: &Email) -> StorageResult<bool>;

    /// Deletes the session for `email` only if it expired at or before `now`.
    ///
    /// A session activated by a concurrent request in the meantime survives.
    fn delete_expired_session(&self, email: &Email, now: DateTime<Utc>) -> StorageResult<bool>;

    /// Lists all sessions ordered by email.
    fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>>;
}

/// Both tables plus the cross-table activation.
pub trait AuthStore: LicenseStore + SessionStore {
    /// Redeems `code` for `email` and replaces their session with one
    /// expiring `duration_hours` after `now`, all in one transaction.
    ///
    /// On any error neither table is modified.
    fn redeem_and_activate(
        &self,
        code: &LicenseCode,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, RedeemError>;
}
