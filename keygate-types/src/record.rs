//! Persisted license and session records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Email, Error, LicenseCode};

/// Longest access a single key may grant: one hundred years.
pub const MAX_DURATION_HOURS: u32 = 876_600;

/// Redemption state of a license key. Moves from `Unused` to `Used` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Issued and not yet redeemed.
    Unused,
    /// Redeemed; can never be redeemed again.
    Used,
}

impl LicenseStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unused" => Ok(Self::Unused),
            "used" => Ok(Self::Used),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// A row of the license table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Normalized license code (primary key).
    pub code: LicenseCode,
    /// Redemption state.
    pub status: LicenseStatus,
    /// Hours of access granted on redemption.
    pub duration_hours: u32,
    /// Issuance time.
    pub created_at: DateTime<Utc>,
    /// Identity that redeemed the key, if any.
    pub redeemed_by: Option<Email>,
    /// Redemption time, if any.
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    /// Creates a freshly issued, unused license.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDuration`] if `duration_hours` is zero or
    /// above [`MAX_DURATION_HOURS`].
    pub fn issue(
        code: LicenseCode,
        duration_hours: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if duration_hours == 0 || duration_hours > MAX_DURATION_HOURS {
            return Err(Error::InvalidDuration(i64::from(duration_hours)));
        }
        Ok(Self {
            code,
            status: LicenseStatus::Unused,
            duration_hours,
            created_at,
            redeemed_by: None,
            redeemed_at: None,
        })
    }

    /// Returns true if the key has already been redeemed.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.status == LicenseStatus::Used
    }
}

/// A row of the session table. At most one exists per email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Verified identity (primary key).
    pub email: Email,
    /// Instant after which the session no longer authorizes.
    pub expires_at: DateTime<Utc>,
    /// License code whose redemption created this session.
    pub source_key: Option<LicenseCode>,
}

impl SessionRecord {
    /// Builds the session granted by redeeming `code` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpiryOutOfRange`] if the expiry falls outside the
    /// representable timestamp range.
    pub fn from_redemption(
        email: Email,
        code: LicenseCode,
        duration_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let expires_at = Duration::try_hours(i64::from(duration_hours))
            .and_then(|granted| now.checked_add_signed(granted))
            .ok_or(Error::ExpiryOutOfRange(duration_hours))?;
        Ok(Self {
            email,
            expires_at,
            source_key: Some(code),
        })
    }

    /// Returns true if the session still authorizes at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Hours left at `now`, rounded to two decimals. Zero once expired.
    #[must_use]
    pub fn hours_remaining_at(&self, now: DateTime<Utc>) -> f64 {
        let secs = (self.expires_at - now).num_seconds().max(0);
        (secs as f64 / 36.0).round() / 100.0
    }
}
