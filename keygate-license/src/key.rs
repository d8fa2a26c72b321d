//! License code generation and administrative issuance.
//!
//! Generated codes look like `K7QX-M2PD-9HRT-WBNC`: four groups of four
//! characters drawn from an alphabet without the look-alikes `0 O 1 I`.

use chrono::{DateTime, Utc};
use keygate_storage::{LicenseStore, StorageError};
use keygate_types::{LicenseCode, LicenseRecord};
use rand::Rng;
use tracing::info;

use crate::error::IssueResult;

/// Characters a generated code may contain.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of dash-separated groups in a generated code.
pub const CODE_GROUPS: usize = 4;

/// Characters per group.
pub const CODE_GROUP_LEN: usize = 4;

/// Attempts made before giving up on a generated code that keeps colliding.
const MAX_GENERATE_ATTEMPTS: usize = 3;

/// Generates a random license code string, already in normalized form.
#[must_use]
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let groups: Vec<String> = (0..CODE_GROUPS)
        .map(|_| {
            (0..CODE_GROUP_LEN)
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect()
        })
        .collect();
    groups.join("-")
}

/// Issues a new unused license.
///
/// With `code` set, that code is normalized and used as-is; a clash with an
/// existing license is an error. Without it a random code is generated.
///
/// # Errors
///
/// Returns [`IssueError::Invalid`](crate::IssueError::Invalid) for a zero
/// duration or blank code, and
/// [`IssueError::Storage`](crate::IssueError::Storage) if the insert fails.
pub fn issue_key(
    store: &dyn LicenseStore,
    duration_hours: u32,
    code: Option<&str>,
    now: DateTime<Utc>,
) -> IssueResult<LicenseRecord> {
    let record = match code {
        Some(raw) => {
            let record = LicenseRecord::issue(LicenseCode::parse(raw)?, duration_hours, now)?;
            store.insert_license(&record)?;
            record
        }
        None => insert_generated(store, duration_hours, now)?,
    };

    info!(
        code = %record.code.redacted(),
        duration_hours = record.duration_hours,
        "license issued"
    );
    Ok(record)
}

fn insert_generated(
    store: &dyn LicenseStore,
    duration_hours: u32,
    now: DateTime<Utc>,
) -> IssueResult<LicenseRecord> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let record = LicenseRecord::issue(LicenseCode::parse(&generate_code())?, duration_hours, now)?;
        match store.insert_license(&record) {
            Ok(()) => return Ok(record),
            Err(StorageError::Duplicate(_)) if attempt < MAX_GENERATE_ATTEMPTS => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
