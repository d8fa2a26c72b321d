//! Identity verification for Keygate.
//!
//! Turns an opaque bearer token into a verified email address by asking an
//! external identity provider, or into a classified [`VerificationError`].
//!
//! # Design Principles
//!
//! - **No caching**: every call goes to the provider; a token that was valid a
//!   minute ago proves nothing now
//! - **No retries**: a failed verification is reported, never retried
//! - **Bounded**: the outbound call always carries a timeout

mod error;
mod fixed;
mod tokeninfo;
mod verifier;

pub use error::{VerificationError, VerificationResult};
pub use fixed::StaticVerifier;
pub use tokeninfo::{TokenInfoConfig, TokenInfoVerifier, DEFAULT_TIMEOUT_MS};
pub use verifier::{IdentityVerifier, VerifiedIdentity};
