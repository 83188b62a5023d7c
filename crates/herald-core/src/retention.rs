//! Retention settings.
//!
//! Two independent windows apply to every notification:
//!
//! - **expiry**: when a record is created without an explicit `expires_at`,
//!   it is set to `created_at + expire_after`. Expired records drop out of
//!   filtered reads but stay in storage.
//! - **purge**: an external sweep physically deletes records whose
//!   `created_at` is older than `purge_after`, regardless of `expires_at` or
//!   soft-deletion.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound for either window, in days.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
  pub expire_after_days: u32,
  pub purge_after_days:  u32,
}

impl Default for RetentionPolicy {
  fn default() -> Self {
    Self { expire_after_days: 30, purge_after_days: 90 }
  }
}

impl RetentionPolicy {
  /// Reject windows longer than [`MAX_RETENTION_DAYS`].
  pub fn validate(&self) -> Result<()> {
    for (field, days) in [
      ("expire_after_days", self.expire_after_days),
      ("purge_after_days", self.purge_after_days),
    ] {
      if days > MAX_RETENTION_DAYS {
        return Err(Error::validation(
          field,
          format!("{days} exceeds the maximum of {MAX_RETENTION_DAYS} days"),
        ));
      }
    }
    Ok(())
  }

  /// Clamped to [`MAX_RETENTION_DAYS`].
  pub fn expire_after(&self) -> Duration {
    Duration::days(i64::from(self.expire_after_days.min(MAX_RETENTION_DAYS)))
  }

  /// Clamped to [`MAX_RETENTION_DAYS`].
  pub fn purge_after(&self) -> Duration {
    Duration::days(i64::from(self.purge_after_days.min(MAX_RETENTION_DAYS)))
  }

  /// Records created strictly before this instant are eligible for purge.
  pub fn purge_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now
      .checked_sub_signed(self.purge_after())
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_thirty_and_ninety_days() {
    let policy = RetentionPolicy::default();
    assert_eq!(policy.expire_after(), Duration::days(30));
    assert_eq!(policy.purge_after(), Duration::days(90));

    let now = Utc::now();
    assert_eq!(policy.purge_cutoff(now), now - Duration::days(90));
  }

  #[test]
  fn oversized_windows_are_rejected_and_clamped() {
    let policy = RetentionPolicy { expire_after_days: u32::MAX, purge_after_days: 90 };
    assert_eq!(policy.validate().unwrap_err().field(), Some("expire_after_days"));
    assert_eq!(policy.expire_after(), Duration::days(i64::from(MAX_RETENTION_DAYS)));

    let policy = RetentionPolicy { expire_after_days: 30, purge_after_days: 200_000_000 };
    assert_eq!(policy.validate().unwrap_err().field(), Some("purge_after_days"));
    let now = Utc::now();
    assert_eq!(
      policy.purge_cutoff(now),
      now - Duration::days(i64::from(MAX_RETENTION_DAYS))
    );

    assert!(RetentionPolicy::default().validate().is_ok());
  }

  #[test]
  fn partial_config_keeps_other_default() {
    let policy: RetentionPolicy =
      serde_json::from_str(r#"{"purge_after_days": 7}"#).unwrap();
    assert_eq!(policy.expire_after_days, 30);
    assert_eq!(policy.purge_after_days, 7);
  }
}
