//! Priority model — direct selection or derivation from impact × urgency.
//!
//! A request type either lets users pick a priority level directly, or marks
//! itself "complex", in which case users pick impact and urgency and the
//! priority is always recomputed from [`PRIORITY_MAP`]. The two shapes are an
//! explicit union ([`Priority`]) rather than a stored value with a shadowed
//! inverse.

use serde::{Deserialize, Serialize};

// ─── Levels ──────────────────────────────────────────────────────────────────

/// The six priority levels a request can display, lowest to highest.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
  NotSet,
  VeryLow,
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

impl PriorityLevel {
  /// Numeric code, `0..=5`; matches the stored selection values.
  pub fn code(self) -> u8 {
    match self {
      Self::NotSet => 0,
      Self::VeryLow => 1,
      Self::Low => 2,
      Self::Medium => 3,
      Self::High => 4,
      Self::Critical => 5,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(Self::NotSet),
      1 => Some(Self::VeryLow),
      2 => Some(Self::Low),
      3 => Some(Self::Medium),
      4 => Some(Self::High),
      5 => Some(Self::Critical),
      _ => None,
    }
  }
}

/// How widely a request affects the organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
  NotSet,
  Low,
  #[default]
  Medium,
  High,
}

impl Impact {
  pub fn index(self) -> usize {
    match self {
      Self::NotSet => 0,
      Self::Low => 1,
      Self::Medium => 2,
      Self::High => 3,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(Self::NotSet),
      1 => Some(Self::Low),
      2 => Some(Self::Medium),
      3 => Some(Self::High),
      _ => None,
    }
  }
}

/// How quickly a request needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
  NotSet,
  Low,
  #[default]
  Medium,
  High,
}

impl Urgency {
  pub fn index(self) -> usize {
    match self {
      Self::NotSet => 0,
      Self::Low => 1,
      Self::Medium => 2,
      Self::High => 3,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      0 => Some(Self::NotSet),
      1 => Some(Self::Low),
      2 => Some(Self::Medium),
      3 => Some(Self::High),
      _ => None,
    }
  }
}

// ─── Derivation table ────────────────────────────────────────────────────────

/// Priority derived from (impact, urgency). Outer index is impact, inner is
/// urgency. For example, impact Low (1) with urgency High (3) yields Medium.
pub const PRIORITY_MAP: [[PriorityLevel; 4]; 4] = {
  use PriorityLevel::{Critical, High, Low, Medium, NotSet, VeryLow};
  [
    [NotSet, VeryLow, Low, Medium],
    [VeryLow, VeryLow, Low, Medium],
    [Low, Low, Medium, High],
    [Medium, Medium, High, Critical],
  ]
};

/// Look up the derived level for an (impact, urgency) pair.
pub fn derived_level(impact: Impact, urgency: Urgency) -> PriorityLevel {
  PRIORITY_MAP[impact.index()][urgency.index()]
}

// ─── Priority union ──────────────────────────────────────────────────────────

/// The priority of a request.
///
/// The shape is fixed by the owning type's `complex_priority` flag at request
/// creation: `Direct` for simple types, `Derived` for complex ones. A direct
/// write against a `Derived` priority is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Priority {
  Direct {
    level: PriorityLevel,
  },
  Derived {
    impact:  Impact,
    urgency: Urgency,
  },
}

impl Priority {
  /// The visible priority level, recomputed on every read for `Derived`.
  pub fn effective(&self) -> PriorityLevel {
    match *self {
      Self::Direct { level } => level,
      Self::Derived { impact, urgency } => derived_level(impact, urgency),
    }
  }

  pub fn is_derived(&self) -> bool { matches!(self, Self::Derived { .. }) }
}

// ─── Update input ────────────────────────────────────────────────────────────

/// Partial update accepted by
/// [`Engine::set_priority_fields`](crate::engine::Engine::set_priority_fields).
/// Fields left `None` are unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PriorityUpdate {
  pub priority: Option<PriorityLevel>,
  pub impact:   Option<Impact>,
  pub urgency:  Option<Urgency>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn derived_level_matches_map_for_all_pairs() {
    for impact_code in 0..=3u8 {
      for urgency_code in 0..=3u8 {
        let impact = Impact::from_code(impact_code).unwrap();
        let urgency = Urgency::from_code(urgency_code).unwrap();
        assert_eq!(
          derived_level(impact, urgency),
          PRIORITY_MAP[impact_code as usize][urgency_code as usize],
        );
      }
    }
  }

  #[test]
  fn derived_level_spot_checks() {
    // impact=0 (not set), urgency=2 (medium) -> level 2 (low)
    assert_eq!(
      derived_level(Impact::NotSet, Urgency::Medium),
      PriorityLevel::Low
    );
    assert_eq!(
      derived_level(Impact::High, Urgency::High),
      PriorityLevel::Critical
    );
  }

  #[test]
  fn direct_priority_passes_through() {
    let p = Priority::Direct { level: PriorityLevel::High };
    assert_eq!(p.effective(), PriorityLevel::High);
    assert!(!p.is_derived());
  }

  #[test]
  fn derived_priority_recomputes_on_read() {
    let p = Priority::Derived {
      impact:  Impact::Medium,
      urgency: Urgency::High,
    };
    assert_eq!(p.effective(), PriorityLevel::High);
    assert!(p.is_derived());
  }

  #[test]
  fn level_codes_roundtrip() {
    for code in 0..=5u8 {
      assert_eq!(PriorityLevel::from_code(code).unwrap().code(), code);
    }
    assert!(PriorityLevel::from_code(6).is_none());
  }
}
