//! The request (ticket) entity.
//!
//! Requests are mutated through the [`Engine`](crate::engine::Engine) only.
//! `name` and `type_id` are immutable after creation; every other tracked
//! field change flows through the lifecycle pipeline and lands in the event
//! log.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::priority::{Impact, Priority, PriorityLevel, Urgency};

// ─── Kanban state ────────────────────────────────────────────────────────────

/// Orthogonal UI-flow hint, independent of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanbanState {
  /// The default situation.
  #[default]
  Normal,
  /// Something is preventing progress.
  Blocked,
  /// Ready to be pulled to the next stage.
  Done,
}

impl KanbanState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Normal => "normal",
      Self::Blocked => "blocked",
      Self::Done => "done",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code {
      "normal" => Some(Self::Normal),
      "blocked" => Some(Self::Blocked),
      "done" => Some(Self::Done),
      _ => None,
    }
  }
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// A ticket progressing through the stages of its type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
  pub request_id: Uuid,
  /// Unique, assigned once at creation from the type's sequence.
  pub name:       String,
  /// Immutable after creation.
  pub type_id:    Uuid,
  /// Always a stage belonging to `type_id`.
  pub stage_id:   Uuid,

  pub category_id:  Option<Uuid>,
  pub priority:     Priority,
  pub kanban_state: KanbanState,

  /// Assignee; the user responsible for the next action.
  pub user_id:    Option<Uuid>,
  /// Who raised the request.
  pub author_id:  Uuid,
  /// Organisation or contact the request relates to.
  pub partner_id: Option<Uuid>,

  pub request_text:  String,
  pub response_text: Option<String>,
  pub deadline_date: Option<NaiveDate>,

  pub date_created:  DateTime<Utc>,
  pub date_assigned: Option<DateTime<Utc>>,
  pub date_moved:    Option<DateTime<Utc>>,
  pub date_closed:   Option<DateTime<Utc>>,

  pub created_by: Uuid,
  pub moved_by:   Option<Uuid>,
  pub closed_by:  Option<Uuid>,

  /// The route taken by the most recent stage change.
  pub last_route_id: Option<Uuid>,

  /// Optimistic-concurrency version; bumped on every committed write.
  pub version: u64,
}

impl Request {
  /// The visible priority level (derived for complex-priority types).
  pub fn effective_priority(&self) -> PriorityLevel { self.priority.effective() }
}

// ─── NewRequest ──────────────────────────────────────────────────────────────

/// Input to [`Engine::create_request`](crate::engine::Engine::create_request).
/// Unset fields fall back to the type's defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
  pub type_id:   Uuid,
  pub author_id: Uuid,

  /// Explicit name; generated from the type's sequence when `None`.
  pub name:          Option<String>,
  pub category_id:   Option<Uuid>,
  pub partner_id:    Option<Uuid>,
  pub user_id:       Option<Uuid>,
  pub request_text:  Option<String>,
  pub deadline_date: Option<NaiveDate>,

  pub priority: Option<PriorityLevel>,
  pub impact:   Option<Impact>,
  pub urgency:  Option<Urgency>,
}

impl NewRequest {
  /// Convenience constructor with all optional fields unset.
  pub fn new(type_id: Uuid, author_id: Uuid) -> Self {
    Self {
      type_id,
      author_id,
      name: None,
      category_id: None,
      partner_id: None,
      user_id: None,
      request_text: None,
      deadline_date: None,
      priority: None,
      impact: None,
      urgency: None,
    }
  }
}
