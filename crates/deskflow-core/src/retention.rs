//! Event retention policy.
//!
//! Passed explicitly into the vacuum operation rather than read from ambient
//! global state; callers (the server binary, a cron collaborator) own where
//! the values come from.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionUnit {
  Days,
  Weeks,
  Months,
}

/// How long event records are kept before the vacuum sweep removes them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionPolicy {
  /// When `false`, vacuum is a no-op regardless of event age.
  pub auto_remove: bool,
  pub value:       u32,
  pub unit:        RetentionUnit,
}

impl Default for RetentionPolicy {
  /// 90 days, enabled.
  fn default() -> Self {
    Self { auto_remove: true, value: 90, unit: RetentionUnit::Days }
  }
}

impl RetentionPolicy {
  /// Events dated strictly before the returned instant are eligible for
  /// deletion. Recomputed on every invocation.
  pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    match self.unit {
      RetentionUnit::Days => now - Duration::days(i64::from(self.value)),
      RetentionUnit::Weeks => now - Duration::weeks(i64::from(self.value)),
      RetentionUnit::Months => now
        .checked_sub_months(Months::new(self.value))
        .unwrap_or(now),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_90_days() {
    let policy = RetentionPolicy::default();
    assert!(policy.auto_remove);
    let now = Utc::now();
    assert_eq!(policy.cutoff(now), now - Duration::days(90));
  }

  #[test]
  fn weeks_and_months_units() {
    let now = Utc::now();
    let weeks = RetentionPolicy {
      auto_remove: true,
      value:       2,
      unit:        RetentionUnit::Weeks,
    };
    assert_eq!(weeks.cutoff(now), now - Duration::days(14));

    let months = RetentionPolicy {
      auto_remove: true,
      value:       1,
      unit:        RetentionUnit::Months,
    };
    assert!(months.cutoff(now) < now - Duration::days(27));
  }
}
