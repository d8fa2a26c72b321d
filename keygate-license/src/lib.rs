//! License redemption and session authorization for Keygate.
//!
//! This crate handles:
//! - The per-request authorization decision (verify, check session, redeem)
//! - Read-only license status lookups
//! - Administrative key issuance
//!
//! # Design Principles
//!
//! - **Exactly-once keys**: redemption and session creation share one storage
//!   transaction, so a key is never spent without granting its session
//! - **No trusted client claims**: the email always comes from the identity
//!   provider, re-verified on every request
//! - **No partial failures**: every rejected request leaves storage as it
//!   found it, except for removing a session that has already expired
//!
//! # Flow
//!
//! ```text
//! token ─▶ verify ─▶ session valid? ──yes──▶ authorized
//!                        │ no (expired sessions are removed)
//!                        ▼
//!                   key supplied? ──no──▶ needs key
//!                        │ yes
//!                        ▼
//!              redeem + replace session ─▶ authorized
//!                        │ not found / used
//!                        ▼
//!                     rejected
//! ```

mod authorizer;
mod clock;
mod error;
mod key;

pub use authorizer::{Authorization, AuthorizeRequest, Authorizer, Grant, StatusReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthorizeError, AuthorizeResult, IssueError, IssueResult};
pub use key::{generate_code, issue_key, CODE_ALPHABET, CODE_GROUPS, CODE_GROUP_LEN};
