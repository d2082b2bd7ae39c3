//! Event records — the append-only audit trail of a request.
//!
//! An event captures one semantic change (created, reassigned, stage moved,
//! ...) with the old/new values relevant to that change. Events are created
//! exclusively by the lifecycle engine, never mutated, and deleted only by
//! the retention vacuum.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  priority::{Impact, PriorityLevel, Urgency},
  request::KanbanState,
};

// ─── EventData ───────────────────────────────────────────────────────────────

/// The typed payload of an event. The variant name serves as the event code
/// stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum EventData {
  Created,

  // ── Assignment ──────────────────────────────────────────────────────────
  Assigned {
    new_user: Uuid,
    comment:  Option<String>,
  },
  Reassigned {
    old_user: Uuid,
    new_user: Uuid,
    comment:  Option<String>,
  },
  Unassigned {
    old_user: Uuid,
  },

  // ── Stage transitions ───────────────────────────────────────────────────
  StageChanged {
    route:     Uuid,
    old_stage: Uuid,
    new_stage: Uuid,
  },
  Closed {
    route:     Uuid,
    old_stage: Uuid,
    new_stage: Uuid,
  },
  Reopened {
    route:     Uuid,
    old_stage: Uuid,
    new_stage: Uuid,
  },

  // ── Field changes ───────────────────────────────────────────────────────
  /// Request text edited.
  Changed {
    old_text: String,
    new_text: String,
  },
  CategoryChanged {
    old_category: Option<Uuid>,
    new_category: Option<Uuid>,
  },
  PriorityChanged {
    old_priority: PriorityLevel,
    new_priority: PriorityLevel,
  },
  ImpactChanged {
    old_impact: Impact,
    new_impact: Impact,
  },
  UrgencyChanged {
    old_urgency: Urgency,
    new_urgency: Urgency,
  },
  DeadlineChanged {
    old_deadline: Option<NaiveDate>,
    new_deadline: Option<NaiveDate>,
  },
  KanbanStateChanged {
    old_state: KanbanState,
    new_state: KanbanState,
  },

  // ── Time tracking ───────────────────────────────────────────────────────
  TimetrackingStartWork {
    line: Uuid,
  },
  TimetrackingStopWork {
    line:         Uuid,
    amount_hours: f64,
  },
}

impl EventData {
  /// The event code stored in the `event_code` column.
  /// Must match the `rename_all = "kebab-case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Created => "created",
      Self::Assigned { .. } => "assigned",
      Self::Reassigned { .. } => "reassigned",
      Self::Unassigned { .. } => "unassigned",
      Self::StageChanged { .. } => "stage-changed",
      Self::Closed { .. } => "closed",
      Self::Reopened { .. } => "reopened",
      Self::Changed { .. } => "changed",
      Self::CategoryChanged { .. } => "category-changed",
      Self::PriorityChanged { .. } => "priority-changed",
      Self::ImpactChanged { .. } => "impact-changed",
      Self::UrgencyChanged { .. } => "urgency-changed",
      Self::DeadlineChanged { .. } => "deadline-changed",
      Self::KanbanStateChanged { .. } => "kanban-state-changed",
      Self::TimetrackingStartWork { .. } => "timetracking-start-work",
      Self::TimetrackingStopWork { .. } => "timetracking-stop-work",
    }
  }

  /// Serialise the inner payload (without the type tag) for the
  /// `payload_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the event code and JSON payload stored in the
  /// database.
  pub fn from_parts(code: &str, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "type": code, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One immutable audit record. Ordered for display by `(date DESC, insert
/// sequence DESC)` — ties broken by the most recent insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:   Uuid,
  pub request_id: Uuid,
  pub data:       EventData,
  pub date:       DateTime<Utc>,
  /// The acting user.
  pub user_id:    Uuid,
}

impl Event {
  pub fn code(&self) -> &'static str { self.data.discriminant() }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn discriminants_match_serde_tags() {
    let samples = [
      EventData::Created,
      EventData::StageChanged {
        route:     Uuid::new_v4(),
        old_stage: Uuid::new_v4(),
        new_stage: Uuid::new_v4(),
      },
      EventData::KanbanStateChanged {
        old_state: KanbanState::Normal,
        new_state: KanbanState::Blocked,
      },
      EventData::TimetrackingStartWork { line: Uuid::new_v4() },
    ];
    for data in samples {
      let full = serde_json::to_value(&data).unwrap();
      assert_eq!(full["type"], data.discriminant());
    }
  }

  #[test]
  fn payload_roundtrips_through_parts() {
    let data = EventData::Reassigned {
      old_user: Uuid::new_v4(),
      new_user: Uuid::new_v4(),
      comment:  Some("handover".into()),
    };
    let json = data.to_json().unwrap();
    let back = EventData::from_parts(data.discriminant(), json).unwrap();
    assert_eq!(back, data);
  }

  #[test]
  fn created_has_null_payload() {
    assert_eq!(
      EventData::Created.to_json().unwrap(),
      serde_json::Value::Null
    );
    let back = EventData::from_parts("created", serde_json::Value::Null).unwrap();
    assert_eq!(back, EventData::Created);
  }
}
