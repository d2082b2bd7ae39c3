//! Timesheet lines — time tracked against a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One span of work on a request. A line is "running" until stopped; each
/// user has at most one running line at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimesheetLine {
  pub line_id:    Uuid,
  pub request_id: Uuid,
  pub user_id:    Uuid,
  pub date_start: DateTime<Utc>,
  pub date_end:   Option<DateTime<Utc>>,
  /// Hours spent; computed when the line is stopped.
  pub amount:     f64,
}

impl TimesheetLine {
  pub fn is_running(&self) -> bool { self.date_end.is_none() }
}
