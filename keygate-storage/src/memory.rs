//! In-memory store used as a test double.

use chrono::{DateTime, Utc};
use keygate_types::{Email, LicenseCode, LicenseRecord, LicenseStatus, SessionRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{RedeemError, StorageError, StorageResult};
use crate::store::{AuthStore, LicenseStore, SessionStore};

#[derive(Debug, Default)]
struct Tables {
    licenses: HashMap<LicenseCode, LicenseRecord>,
    sessions: HashMap<Email, SessionRecord>,
}

impl Tables {
    fn redeem(
        &mut self,
        code: &LicenseCode,
        by: &Email,
        now: DateTime<Utc>,
    ) -> Result<u32, RedeemError> {
        let hours = self.redeemable(code)?;
        if let Some(record) = self.licenses.get_mut(code) {
            record.status = LicenseStatus::Used;
            record.redeemed_by = Some(by.clone());
            record.redeemed_at = Some(now);
        }
        Ok(hours)
    }

    fn redeemable(&self, code: &LicenseCode) -> Result<u32, RedeemError> {
        let record = self.licenses.get(code).ok_or(RedeemError::NotFound)?;
        if record.is_used() {
            return Err(RedeemError::AlreadyUsed);
        }
        Ok(record.duration_hours)
    }
}

/// Store that keeps both tables in a single mutex.
///
/// Holding one lock for the whole of each operation gives the same
/// all-or-nothing behaviour as a transaction. The store also counts every
/// call so tests can assert that a code path never touched storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read operations performed.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write operations attempted, successful or not.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Total operations of any kind.
    #[must_use]
    pub fn accesses(&self) -> usize {
        self.reads() + self.writes()
    }

    fn read(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl LicenseStore for MemoryStore {
    fn insert_license(&self, record: &LicenseRecord) -> StorageResult<()> {
        let mut tables = self.write()?;
        if tables.licenses.contains_key(&record.code) {
            return Err(StorageError::Duplicate(record.code.to_string()));
        }
        tables.licenses.insert(record.code.clone(), record.clone());
        Ok(())
    }

    fn get_license(&self, code: &LicenseCode) -> StorageResult<Option<LicenseRecord>> {
        Ok(self.read()?.licenses.get(code).cloned())
    }

    fn list_licenses(&self) -> StorageResult<Vec<LicenseRecord>> {
        let mut licenses: Vec<_> = self.read()?.licenses.values().cloned().collect();
        licenses.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });
        Ok(licenses)
    }

    fn redeem(
        &self,
        code: &LicenseCode,
        by: &Email,
        now: DateTime<Utc>,
    ) -> Result<u32, RedeemError> {
        self.write()?.redeem(code, by, now)
    }
}

impl SessionStore for MemoryStore {
    fn get_session(&self, email: &Email) -> StorageResult<Option<SessionRecord>> {
        Ok(self.read()?.sessions.get(email).cloned())
    }

    fn put_session(&self, record: &SessionRecord) -> StorageResult<()> {
        self.write()?
            .sessions
            .insert(record.email.clone(), record.clone());
        Ok(())
    }

    fn delete_session(&self, email: &Email) -> StorageResult<bool> {
        Ok(self.write()?.sessions.remove(email).is_some())
    }

    fn delete_expired_session(&self, email: &Email, now: DateTime<Utc>) -> StorageResult<bool> {
        let mut tables = self.write()?;
        match tables.sessions.get(email) {
            Some(session) if !session.is_valid_at(now) => {
                tables.sessions.remove(email);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let mut sessions: Vec<_> = self.read()?.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        Ok(sessions)
    }
}

impl AuthStore for MemoryStore {
    fn redeem_and_activate(
        &self,
        code: &LicenseCode,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, RedeemError> {
        let mut tables = self.write()?;
        // Build the session before touching either table.
        let hours = tables.redeemable(code)?;
        let session = SessionRecord::from_redemption(email.clone(), code.clone(), hours, now)?;
        tables.redeem(code, email, now)?;
        tables.sessions.insert(email.clone(), session.clone());
        Ok(session)
    }
}
