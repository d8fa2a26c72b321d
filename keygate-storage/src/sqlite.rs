//! SQLite-backed store.

use chrono::{DateTime, Utc};
use keygate_types::{Email, LicenseCode, LicenseRecord, LicenseStatus, SessionRecord};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{RedeemError, StorageError, StorageResult};
use crate::store::{AuthStore, LicenseStore, SessionStore};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent license and session store backed by SQLite.
///
/// Every write that reads before it writes runs in a `BEGIN IMMEDIATE`
/// transaction, so two connections to the same file cannot both redeem one
/// key.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened license database");
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS licenses (
                code TEXT PRIMARY KEY,
                status TEXT NOT NULL CHECK (status IN ('unused', 'used')),
                duration_hours INTEGER NOT NULL CHECK (duration_hours > 0),
                created_at INTEGER NOT NULL,
                redeemed_by TEXT,
                redeemed_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS sessions (
                email TEXT PRIMARY KEY,
                expires_at INTEGER NOT NULL,
                source_key TEXT
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

// ── Row mapping ──────────────────────────────────────────────────

struct LicenseRow {
    code: String,
    status: String,
    duration_hours: i64,
    created_at: i64,
    redeemed_by: Option<String>,
    redeemed_at: Option<i64>,
}

impl LicenseRow {
    const COLUMNS: &'static str =
        "code, status, duration_hours, created_at, redeemed_by, redeemed_at";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get(0)?,
            status: row.get(1)?,
            duration_hours: row.get(2)?,
            created_at: row.get(3)?,
            redeemed_by: row.get(4)?,
            redeemed_at: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<LicenseRecord> {
        let duration_hours = u32::try_from(self.duration_hours)
            .map_err(|_| keygate_types::Error::InvalidDuration(self.duration_hours))?;
        Ok(LicenseRecord {
            code: LicenseCode::parse(&self.code)?,
            status: self.status.parse()?,
            duration_hours,
            created_at: from_millis(self.created_at)?,
            redeemed_by: self.redeemed_by.as_deref().map(Email::parse).transpose()?,
            redeemed_at: self.redeemed_at.map(from_millis).transpose()?,
        })
    }
}

struct SessionRow {
    email: String,
    expires_at: i64,
    source_key: Option<String>,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            email: row.get(0)?,
            expires_at: row.get(1)?,
            source_key: row.get(2)?,
        })
    }

    fn into_record(self) -> StorageResult<SessionRecord> {
        Ok(SessionRecord {
            email: Email::parse(&self.email)?,
            expires_at: from_millis(self.expires_at)?,
            source_key: self.source_key.as_deref().map(LicenseCode::parse).transpose()?,
        })
    }
}

fn from_millis(millis: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(StorageError::InvalidData(keygate_types::Error::InvalidTimestamp(millis)))
}

// ── Transaction bodies ───────────────────────────────────────────

fn redeem_in(
    tx: &Transaction<'_>,
    code: &LicenseCode,
    by: &Email,
    now: DateTime<Utc>,
) -> Result<u32, RedeemError> {
    let row = tx
        .query_row(
            &format!("SELECT {} FROM licenses WHERE code = ?1", LicenseRow::COLUMNS),
            params![code.as_str()],
            LicenseRow::from_row,
        )
        .optional()?;
    let record = row.ok_or(RedeemError::NotFound)?.into_record()?;
    if record.is_used() {
        return Err(RedeemError::AlreadyUsed);
    }

    let updated = tx.execute(
        "UPDATE licenses SET status = ?2, redeemed_by = ?3, redeemed_at = ?4
         WHERE code = ?1 AND status = ?5",
        params![
            code.as_str(),
            LicenseStatus::Used.as_str(),
            by.as_str(),
            now.timestamp_millis(),
            LicenseStatus::Unused.as_str(),
        ],
    )?;
    if updated != 1 {
        return Err(RedeemError::AlreadyUsed);
    }
    Ok(record.duration_hours)
}

fn replace_session_in(tx: &Transaction<'_>, record: &SessionRecord) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM sessions WHERE email = ?1",
        params![record.email.as_str()],
    )?;
    tx.execute(
        "INSERT INTO sessions (email, expires_at, source_key) VALUES (?1, ?2, ?3)",
        params![
            record.email.as_str(),
            record.expires_at.timestamp_millis(),
            record.source_key.as_ref().map(LicenseCode::as_str),
        ],
    )?;
    Ok(())
}

// ── LicenseStore ─────────────────────────────────────────────────

impl LicenseStore for SqliteStore {
    fn insert_license(&self, record: &LicenseRecord) -> StorageResult<()> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO licenses
                (code, status, duration_hours, created_at, redeemed_by, redeemed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.code.as_str(),
                record.status.as_str(),
                i64::from(record.duration_hours),
                record.created_at.timestamp_millis(),
                record.redeemed_by.as_ref().map(Email::as_str),
                record.redeemed_at.map(|t| t.timestamp_millis()),
            ],
        )?;
        if inserted == 0 {
            return Err(StorageError::Duplicate(record.code.to_string()));
        }
        debug!(code = %record.code.redacted(), "license inserted");
        Ok(())
    }

    fn get_license(&self, code: &LicenseCode) -> StorageResult<Option<LicenseRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM licenses WHERE code = ?1", LicenseRow::COLUMNS),
            params![code.as_str()],
            LicenseRow::from_row,
        )
        .optional()?
        .map(LicenseRow::into_record)
        .transpose()
    }

    fn list_licenses(&self) -> StorageResult<Vec<LicenseRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM licenses ORDER BY created_at, code",
            LicenseRow::COLUMNS
        ))?;
        let rows = stmt.query_map([], LicenseRow::from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }

    fn redeem(
        &self,
        code: &LicenseCode,
        by: &Email,
        now: DateTime<Utc>,
    ) -> Result<u32, RedeemError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let hours = redeem_in(&tx, code, by, now)?;
        tx.commit()?;
        Ok(hours)
    }
}

// ── SessionStore ─────────────────────────────────────────────────

impl SessionStore for SqliteStore {
    fn get_session(&self, email: &Email) -> StorageResult<Option<SessionRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT email, expires_at, source_key FROM sessions WHERE email = ?1",
            params![email.as_str()],
            SessionRow::from_row,
        )
        .optional()?
        .map(SessionRow::into_record)
        .transpose()
    }

    fn put_session(&self, record: &SessionRecord) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        replace_session_in(&tx, record)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_session(&self, email: &Email) -> StorageResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE email = ?1",
            params![email.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn delete_expired_session(&self, email: &Email, now: DateTime<Utc>) -> StorageResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE email = ?1 AND expires_at <= ?2",
            params![email.as_str(), now.timestamp_millis()],
        )?;
        Ok(deleted > 0)
    }

    fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT email, expires_at, source_key FROM sessions ORDER BY email")?;
        let rows = stmt.query_map([], SessionRow::from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?.into_record()?);
        }
        Ok(result)
    }
}

// ── AuthStore ────────────────────────────────────────────────────

impl AuthStore for SqliteStore {
    fn redeem_and_activate(
        &self,
        code: &LicenseCode,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<SessionRecord, RedeemError> {
        let mut conn = self.lock()?;
        // Dropping `tx` on any early return rolls both tables back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let hours = redeem_in(&tx, code, email, now)?;
        let session = SessionRecord::from_redemption(email.clone(), code.clone(), hours, now)?;
        replace_session_in(&tx, &session)?;
        tx.commit()?;
        Ok(session)
    }
}
