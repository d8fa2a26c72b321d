//! The per-request authorization state machine.

use chrono::{DateTime, Utc};
use keygate_identity::{IdentityVerifier, VerifiedIdentity};
use keygate_storage::{AuthStore, StorageError};
use keygate_types::{Email, LicenseCode, SessionRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthorizeError, AuthorizeResult};

/// What the client sent. Both fields are optional at this layer so that a
/// missing token becomes [`AuthorizeError::TokenRequired`] rather than a
/// decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeRequest {
    /// Bearer token for the identity provider.
    pub token: Option<String>,
    /// One-time license code.
    pub key: Option<String>,
}

impl AuthorizeRequest {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            key: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// How an authorized request got its access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// An unexpired session already existed; no key was consumed.
    ExistingSession,
    /// The supplied key was redeemed and a new session created.
    Activated { key: LicenseCode },
}

/// A successful authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorization {
    pub email: Email,
    pub expires_at: DateTime<Utc>,
    pub hours_remaining: f64,
    pub grant: Grant,
}

impl Authorization {
    fn from_session(session: SessionRecord, now: DateTime<Utc>, grant: Grant) -> Self {
        Self {
            hours_remaining: session.hours_remaining_at(now),
            email: session.email,
            expires_at: session.expires_at,
            grant,
        }
    }
}

/// Read-only view of an identity's license state.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub email: Email,
    /// The unexpired session, if any.
    pub session: Option<SessionRecord>,
    pub hours_remaining: Option<f64>,
}

impl StatusReport {
    #[must_use]
    pub fn has_license(&self) -> bool {
        self.session.is_some()
    }
}

/// Sequences identity verification, session lookup and key redemption.
///
/// Holds no per-request state; one instance serves all requests.
pub struct Authorizer {
    verifier: Arc<dyn IdentityVerifier>,
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
}

impl Authorizer {
    /// Creates an authorizer using the system clock.
    pub fn new(verifier: Arc<dyn IdentityVerifier>, store: Arc<dyn AuthStore>) -> Self {
        Self {
            verifier,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current server time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Runs a synchronous store call on the blocking thread pool, so a
    /// contended database never stalls the async workers.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or [`StorageError::Task`] if the
    /// blocking task panicked or was cancelled.
    pub async fn with_store<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: FnOnce(&dyn AuthStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "blocking store task failed");
                Err(StorageError::Task(e.to_string()).into())
            }
        }
    }

    /// Decides one authorization request.
    ///
    /// A still-valid session wins over a supplied key, which is then left
    /// unspent. Apart from clearing an expired session, no failure path
    /// writes to storage.
    pub async fn authorize(&self, request: &AuthorizeRequest) -> AuthorizeResult<Authorization> {
        let identity = self.identify(request.token.as_deref()).await?;
        let email = identity.email;
        let now = self.clock.now();

        let lookup = email.clone();
        let existing = self
            .with_store(move |store| store.get_session(&lookup))
            .await
            .map_err(store_failure)?;
        if let Some(session) = existing {
            if session.is_valid_at(now) {
                debug!(%email, expires_at = %session.expires_at, "session valid");
                return Ok(Authorization::from_session(session, now, Grant::ExistingSession));
            }
            let stale = email.clone();
            let removed = self
                .with_store(move |store| store.delete_expired_session(&stale, now))
                .await
                .map_err(store_failure)?;
            debug!(%email, removed, "expired session cleared");
        }

        let Some(code) = request
            .key
            .as_deref()
            .and_then(|raw| LicenseCode::parse(raw).ok())
        else {
            debug!(%email, "no session and no key");
            return Err(AuthorizeError::NeedsKey);
        };

        let (key, owner) = (code.clone(), email.clone());
        let session = self
            .with_store(move |store| store.redeem_and_activate(&key, &owner, now))
            .await
            .map_err(|e| {
                let err = AuthorizeError::from(e);
                match &err {
                    AuthorizeError::Store(source) => {
                        warn!(%email, error = %source, "activation failed in store");
                    }
                    other => debug!(%email, code = %code.redacted(), kind = other.kind(), "key refused"),
                }
                err
            })?;

        info!(
            %email,
            code = %code.redacted(),
            expires_at = %session.expires_at,
            "license activated"
        );
        Ok(Authorization::from_session(
            session,
            now,
            Grant::Activated { key: code },
        ))
    }

    /// Reports whether the token's owner currently holds a valid session.
    ///
    /// Never writes; an expired session is reported as absent but left in
    /// place for the next [`authorize`](Self::authorize) call to clear.
    pub async fn status(&self, token: Option<&str>) -> AuthorizeResult<StatusReport> {
        let identity = self.identify(token).await?;
        let now = self.clock.now();
        let lookup = identity.email.clone();
        let session = self
            .with_store(move |store| store.get_session(&lookup))
            .await
            .map_err(store_failure)?
            .filter(|s| s.is_valid_at(now));

        Ok(StatusReport {
            hours_remaining: session.as_ref().map(|s| s.hours_remaining_at(now)),
            email: identity.email,
            session,
        })
    }

    async fn identify(&self, token: Option<&str>) -> AuthorizeResult<VerifiedIdentity> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthorizeError::TokenRequired)?;

        self.verifier.verify(token).await.map_err(|e| {
            warn!(
                provider = self.verifier.provider_name(),
                reason = e.reason(),
                error = %e,
                "identity verification failed"
            );
            AuthorizeError::from(e)
        })
    }
}

fn store_failure(err: StorageError) -> AuthorizeError {
    warn!(error = %err, "store operation failed");
    AuthorizeError::Store(err)
}
