use keygate_identity::VerificationError;
use keygate_license::{AuthorizeError, IssueError};
use keygate_storage::{RedeemError, StorageError};

#[test]
fn redeem_errors_map_to_key_errors() {
    assert!(matches!(
        AuthorizeError::from(RedeemError::NotFound),
        AuthorizeError::InvalidKey
    ));
    assert!(matches!(
        AuthorizeError::from(RedeemError::AlreadyUsed),
        AuthorizeError::KeyAlreadyUsed
    ));
    assert!(matches!(
        AuthorizeError::from(RedeemError::Storage(StorageError::LockPoisoned)),
        AuthorizeError::Store(_)
    ));
}

#[test]
fn kinds_are_stable() {
    assert_eq!(AuthorizeError::TokenRequired.kind(), "token_required");
    assert_eq!(AuthorizeError::NeedsKey.kind(), "needs_key");
    assert_eq!(AuthorizeError::InvalidKey.kind(), "invalid_key");
    assert_eq!(AuthorizeError::KeyAlreadyUsed.kind(), "key_already_used");
}

#[test]
fn display_messages() {
    assert_eq!(AuthorizeError::TokenRequired.to_string(), "token required");
    assert_eq!(AuthorizeError::InvalidKey.to_string(), "invalid key");
    assert_eq!(AuthorizeError::KeyAlreadyUsed.to_string(), "key already used");
    let err = AuthorizeError::from(VerificationError::NoEmail);
    assert!(err.to_string().contains("no email"));
}

#[test]
fn only_needs_key_asks_for_key() {
    assert!(AuthorizeError::NeedsKey.needs_key());
    assert!(!AuthorizeError::InvalidKey.needs_key());
    assert!(!AuthorizeError::TokenRequired.needs_key());
}

#[test]
fn issue_error_display() {
    let err = IssueError::from(StorageError::Duplicate("ABC".into()));
    assert!(err.to_string().contains("already exists"));
}
