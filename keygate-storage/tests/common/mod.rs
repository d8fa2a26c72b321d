//! Helpers shared by the storage test files.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use keygate_storage::{AuthStore, RedeemError, StorageError};
use keygate_types::{Email, LicenseCode, LicenseRecord, LicenseStatus, SessionRecord};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn code(s: &str) -> LicenseCode {
    LicenseCode::parse(s).unwrap()
}

pub fn email(s: &str) -> Email {
    Email::parse(s).unwrap()
}

pub fn issue<S: AuthStore>(store: &S, c: &str, hours: u32) -> LicenseRecord {
    let record = LicenseRecord::issue(code(c), hours, t0()).unwrap();
    store.insert_license(&record).unwrap();
    record
}

/// Behaviour every `AuthStore` implementation must share.
pub fn check_store_contract<S: AuthStore>(store: &S) {
    // insert + normalized lookup
    issue(store, "abc123", 24);
    let fetched = store.get_license(&code("ABC123")).unwrap().unwrap();
    assert_eq!(fetched.status, LicenseStatus::Unused);
    assert_eq!(fetched.duration_hours, 24);
    assert_eq!(fetched.created_at, t0());

    // duplicate insert
    let dup = LicenseRecord::issue(code("ABC123"), 1, t0()).unwrap();
    assert!(matches!(
        store.insert_license(&dup),
        Err(StorageError::Duplicate(c)) if c == "ABC123"
    ));

    // missing key
    assert!(store.get_license(&code("NOPE")).unwrap().is_none());
    assert!(matches!(
        store.redeem(&code("NOPE"), &email("a@x.io"), t0()),
        Err(RedeemError::NotFound)
    ));

    // first redemption wins, second is refused
    let hours = store.redeem(&code("abc123"), &email("a@x.io"), t0()).unwrap();
    assert_eq!(hours, 24);
    assert!(matches!(
        store.redeem(&code("ABC123"), &email("b@x.io"), t0()),
        Err(RedeemError::AlreadyUsed)
    ));
    let used = store.get_license(&code("ABC123")).unwrap().unwrap();
    assert!(used.is_used());
    assert_eq!(used.redeemed_by, Some(email("a@x.io")));
    assert_eq!(used.redeemed_at, Some(t0()));

    // sessions replace, never duplicate
    let first = SessionRecord {
        email: email("s@x.io"),
        expires_at: t0() + Duration::hours(1),
        source_key: None,
    };
    let second = SessionRecord {
        email: email("s@x.io"),
        expires_at: t0() + Duration::hours(5),
        source_key: Some(code("K2")),
    };
    store.put_session(&first).unwrap();
    store.put_session(&second).unwrap();
    let sessions = store.list_sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0], second);
    assert_eq!(store.get_session(&email("S@X.io")).unwrap(), Some(second));

    // conditional delete keeps a live session
    assert!(!store.delete_expired_session(&email("s@x.io"), t0()).unwrap());
    assert!(store.get_session(&email("s@x.io")).unwrap().is_some());
    assert!(store
        .delete_expired_session(&email("s@x.io"), t0() + Duration::hours(5))
        .unwrap());
    store.put_session(&sessions[0]).unwrap();

    // delete
    assert!(store.delete_session(&email("s@x.io")).unwrap());
    assert!(!store.delete_session(&email("s@x.io")).unwrap());
    assert!(store.get_session(&email("s@x.io")).unwrap().is_none());
}

/// Activation replaces an existing session and is all-or-nothing.
pub fn check_activation_contract<S: AuthStore>(store: &S) {
    issue(store, "FRESH", 48);
    issue(store, "SPENT", 12);
    store.redeem(&code("SPENT"), &email("other@x.io"), t0()).unwrap();

    let user = email("user@x.io");
    let stale = SessionRecord {
        email: user.clone(),
        expires_at: t0() - Duration::hours(3),
        source_key: Some(code("OLD")),
    };
    store.put_session(&stale).unwrap();

    // used key: nothing changes
    assert!(matches!(
        store.redeem_and_activate(&code("SPENT"), &user, t0()),
        Err(RedeemError::AlreadyUsed)
    ));
    assert_eq!(store.get_session(&user).unwrap(), Some(stale.clone()));

    // unknown key: nothing changes
    assert!(matches!(
        store.redeem_and_activate(&code("MISSING"), &user, t0()),
        Err(RedeemError::NotFound)
    ));
    assert_eq!(store.get_session(&user).unwrap(), Some(stale));

    // fresh key: replaces the session
    let session = store.redeem_and_activate(&code("fresh"), &user, t0()).unwrap();
    assert_eq!(session.expires_at, t0() + Duration::hours(48));
    assert_eq!(session.source_key, Some(code("FRESH")));
    assert_eq!(store.get_session(&user).unwrap(), Some(session));
    assert_eq!(store.list_sessions().unwrap().len(), 1);
    assert!(store.get_license(&code("FRESH")).unwrap().unwrap().is_used());
}

/// A key whose expiry cannot be represented is refused without changing
/// anything, and the store keeps serving other identities.
pub fn check_out_of_range_activation<S: AuthStore>(store: &S) {
    let oversized = LicenseRecord {
        code: code("FOREVER"),
        status: LicenseStatus::Unused,
        duration_hours: u32::MAX,
        created_at: t0(),
        redeemed_by: None,
        redeemed_at: None,
    };
    store.insert_license(&oversized).unwrap();
    issue(store, "NORMAL", 8);

    let user = email("user@x.io");
    assert!(matches!(
        store.redeem_and_activate(&code("FOREVER"), &user, t0()),
        Err(RedeemError::Storage(StorageError::InvalidData(
            keygate_types::Error::ExpiryOutOfRange(u32::MAX)
        )))
    ));
    assert!(!store.get_license(&code("FOREVER")).unwrap().unwrap().is_used());
    assert!(store.get_session(&user).unwrap().is_none());

    let other = email("other@x.io");
    let session = store.redeem_and_activate(&code("NORMAL"), &other, t0()).unwrap();
    assert_eq!(session.expires_at, t0() + Duration::hours(8));
    assert_eq!(store.get_session(&other).unwrap(), Some(session));
}
