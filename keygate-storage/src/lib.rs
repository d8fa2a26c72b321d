//! License and session storage for Keygate.
//!
//! Two logical tables back the service:
//!
//! - `licenses(code PK, status, duration_hours, created_at, redeemed_by, redeemed_at)`
//! - `sessions(email PK, expires_at, source_key)`
//!
//! # Architecture
//!
//! - [`LicenseStore`] and [`SessionStore`] expose each table on its own
//! - [`AuthStore`] adds the one operation that spans both: redeeming a key and
//!   replacing the caller's session inside a single transaction
//! - [`SqliteStore`] is the production backend; [`MemoryStore`] is a test double
//!   with the same atomicity guarantees
//!
//! Duplicate redemptions are serialized by the storage engine's transaction,
//! never by a lock held across an await point in the caller.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{RedeemError, StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{AuthStore, LicenseStore, SessionStore};
