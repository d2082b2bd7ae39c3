//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as ISO 8601
//! dates. Event payloads are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings. The priority union spreads over a `kind`
//! column plus three nullable code columns.

use chrono::{DateTime, NaiveDate, Utc};
use deskflow_core::{
  event::{Event, EventData},
  party::Party,
  priority::{Impact, Priority, PriorityLevel, Urgency},
  request::{KanbanState, Request},
  timesheet::TimesheetLine,
  workflow::{NotificationToggles, RequestType, Route, Stage},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> {
  id.map(encode_uuid)
}

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enum codes ──────────────────────────────────────────────────────────────

pub fn decode_level(v: i64) -> Result<PriorityLevel> {
  u8::try_from(v)
    .ok()
    .and_then(PriorityLevel::from_code)
    .ok_or_else(|| Error::Decode(format!("unknown priority level code: {v}")))
}

pub fn decode_impact(v: i64) -> Result<Impact> {
  u8::try_from(v)
    .ok()
    .and_then(Impact::from_code)
    .ok_or_else(|| Error::Decode(format!("unknown impact code: {v}")))
}

pub fn decode_urgency(v: i64) -> Result<Urgency> {
  u8::try_from(v)
    .ok()
    .and_then(Urgency::from_code)
    .ok_or_else(|| Error::Decode(format!("unknown urgency code: {v}")))
}

pub fn decode_kanban_state(s: &str) -> Result<KanbanState> {
  KanbanState::from_code(s)
    .ok_or_else(|| Error::Decode(format!("unknown kanban state: {s:?}")))
}

// ─── Priority union ──────────────────────────────────────────────────────────

/// `(kind, level, impact, urgency)` — the four priority columns.
pub fn encode_priority(
  p: Priority,
) -> (&'static str, Option<i64>, Option<i64>, Option<i64>) {
  match p {
    Priority::Direct { level } => {
      ("direct", Some(i64::from(level.code())), None, None)
    }
    Priority::Derived { impact, urgency } => (
      "derived",
      None,
      Some(impact.index() as i64),
      Some(urgency.index() as i64),
    ),
  }
}

pub fn decode_priority(
  kind: &str,
  level: Option<i64>,
  impact: Option<i64>,
  urgency: Option<i64>,
) -> Result<Priority> {
  match kind {
    "direct" => {
      let level = level
        .ok_or_else(|| Error::Decode("direct priority without level".into()))?;
      Ok(Priority::Direct { level: decode_level(level)? })
    }
    "derived" => {
      let impact = impact.ok_or_else(|| {
        Error::Decode("derived priority without impact".into())
      })?;
      let urgency = urgency.ok_or_else(|| {
        Error::Decode("derived priority without urgency".into())
      })?;
      Ok(Priority::Derived {
        impact:  decode_impact(impact)?,
        urgency: decode_urgency(urgency)?,
      })
    }
    other => Err(Error::Decode(format!("unknown priority kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a `request_types` row.
pub struct RawRequestType {
  pub type_id:              String,
  pub name:                 String,
  pub code:                 String,
  pub active:               bool,
  pub complex_priority:     bool,
  pub default_priority:     i64,
  pub default_impact:       i64,
  pub default_urgency:      i64,
  pub default_request_text: Option<String>,
  pub sequence_prefix:      Option<String>,
  pub notify_created:       bool,
  pub notify_assigned:      bool,
  pub notify_closed:        bool,
  pub notify_reopened:      bool,
}

impl RawRequestType {
  pub fn into_domain(self) -> Result<RequestType> {
    Ok(RequestType {
      type_id: decode_uuid(&self.type_id)?,
      name: self.name,
      code: self.code,
      active: self.active,
      complex_priority: self.complex_priority,
      default_priority: decode_level(self.default_priority)?,
      default_impact: decode_impact(self.default_impact)?,
      default_urgency: decode_urgency(self.default_urgency)?,
      default_request_text: self.default_request_text,
      sequence_prefix: self.sequence_prefix,
      notify: NotificationToggles {
        created:  self.notify_created,
        assigned: self.notify_assigned,
        closed:   self.notify_closed,
        reopened: self.notify_reopened,
      },
    })
  }
}

/// Raw columns of a `stages` row.
pub struct RawStage {
  pub stage_id: String,
  pub type_id:  String,
  pub name:     String,
  pub code:     String,
  pub sequence: i64,
  pub closed:   bool,
}

impl RawStage {
  pub fn into_domain(self) -> Result<Stage> {
    Ok(Stage {
      stage_id: decode_uuid(&self.stage_id)?,
      type_id:  decode_uuid(&self.type_id)?,
      name:     self.name,
      code:     self.code,
      sequence: u32::try_from(self.sequence).map_err(|_| {
        Error::Decode(format!("negative stage sequence: {}", self.sequence))
      })?,
      closed:   self.closed,
    })
  }
}

/// Raw columns of a `routes` row.
pub struct RawRoute {
  pub route_id:              String,
  pub type_id:               String,
  pub name:                  Option<String>,
  pub stage_from:            String,
  pub stage_to:              String,
  pub close:                 bool,
  pub default_response_text: Option<String>,
  pub website_published:     bool,
}

impl RawRoute {
  pub fn into_domain(self) -> Result<Route> {
    Ok(Route {
      route_id: decode_uuid(&self.route_id)?,
      type_id: decode_uuid(&self.type_id)?,
      name: self.name,
      stage_from: decode_uuid(&self.stage_from)?,
      stage_to: decode_uuid(&self.stage_to)?,
      close: self.close,
      default_response_text: self.default_response_text,
      website_published: self.website_published,
    })
  }
}

/// Raw columns of a `parties` row.
pub struct RawParty {
  pub party_id: String,
  pub name:     String,
  pub email:    Option<String>,
}

impl RawParty {
  pub fn into_domain(self) -> Result<Party> {
    Ok(Party {
      party_id: decode_uuid(&self.party_id)?,
      name:     self.name,
      email:    self.email,
    })
  }
}

/// A `requests` row, used in both directions: encoded from a domain
/// [`Request`] before entering the connection closure, and read back out of
/// a `SELECT`.
pub struct RawRequest {
  pub request_id:     String,
  pub name:           String,
  pub type_id:        String,
  pub stage_id:       String,
  pub category_id:    Option<String>,
  pub priority_kind:  String,
  pub priority_level: Option<i64>,
  pub impact:         Option<i64>,
  pub urgency:        Option<i64>,
  pub kanban_state:   String,
  pub user_id:        Option<String>,
  pub author_id:      String,
  pub partner_id:     Option<String>,
  pub request_text:   String,
  pub response_text:  Option<String>,
  pub deadline_date:  Option<String>,
  pub date_created:   String,
  pub date_assigned:  Option<String>,
  pub date_moved:     Option<String>,
  pub date_closed:    Option<String>,
  pub created_by:     String,
  pub moved_by:       Option<String>,
  pub closed_by:      Option<String>,
  pub last_route_id:  Option<String>,
  pub version:        i64,
}

impl RawRequest {
  pub fn from_domain(request: &Request) -> Self {
    let (priority_kind, priority_level, impact, urgency) =
      encode_priority(request.priority);
    Self {
      request_id: encode_uuid(request.request_id),
      name: request.name.clone(),
      type_id: encode_uuid(request.type_id),
      stage_id: encode_uuid(request.stage_id),
      category_id: encode_opt_uuid(request.category_id),
      priority_kind: priority_kind.to_owned(),
      priority_level,
      impact,
      urgency,
      kanban_state: request.kanban_state.as_str().to_owned(),
      user_id: encode_opt_uuid(request.user_id),
      author_id: encode_uuid(request.author_id),
      partner_id: encode_opt_uuid(request.partner_id),
      request_text: request.request_text.clone(),
      response_text: request.response_text.clone(),
      deadline_date: request.deadline_date.map(encode_date),
      date_created: encode_dt(request.date_created),
      date_assigned: request.date_assigned.map(encode_dt),
      date_moved: request.date_moved.map(encode_dt),
      date_closed: request.date_closed.map(encode_dt),
      created_by: encode_uuid(request.created_by),
      moved_by: encode_opt_uuid(request.moved_by),
      closed_by: encode_opt_uuid(request.closed_by),
      last_route_id: encode_opt_uuid(request.last_route_id),
      version: request.version as i64,
    }
  }

  pub fn into_domain(self) -> Result<Request> {
    Ok(Request {
      request_id: decode_uuid(&self.request_id)?,
      name: self.name,
      type_id: decode_uuid(&self.type_id)?,
      stage_id: decode_uuid(&self.stage_id)?,
      category_id: decode_opt_uuid(self.category_id)?,
      priority: decode_priority(
        &self.priority_kind,
        self.priority_level,
        self.impact,
        self.urgency,
      )?,
      kanban_state: decode_kanban_state(&self.kanban_state)?,
      user_id: decode_opt_uuid(self.user_id)?,
      author_id: decode_uuid(&self.author_id)?,
      partner_id: decode_opt_uuid(self.partner_id)?,
      request_text: self.request_text,
      response_text: self.response_text,
      deadline_date: self.deadline_date.as_deref().map(decode_date).transpose()?,
      date_created: decode_dt(&self.date_created)?,
      date_assigned: decode_opt_dt(self.date_assigned)?,
      date_moved: decode_opt_dt(self.date_moved)?,
      date_closed: decode_opt_dt(self.date_closed)?,
      created_by: decode_uuid(&self.created_by)?,
      moved_by: decode_opt_uuid(self.moved_by)?,
      closed_by: decode_opt_uuid(self.closed_by)?,
      last_route_id: decode_opt_uuid(self.last_route_id)?,
      version: u64::try_from(self.version).map_err(|_| {
        Error::Decode(format!("negative request version: {}", self.version))
      })?,
    })
  }
}

/// An `events` row (minus the internal `seq` column), used in both
/// directions. Serialising the payload happens here so that no fallible
/// JSON work runs inside a connection closure.
pub struct RawEvent {
  pub event_id:     String,
  pub request_id:   String,
  pub event_code:   String,
  pub payload_json: String,
  pub date:         String,
  pub user_id:      String,
}

impl RawEvent {
  pub fn from_domain(event: &Event) -> Result<Self> {
    Ok(Self {
      event_id:     encode_uuid(event.event_id),
      request_id:   encode_uuid(event.request_id),
      event_code:   event.code().to_owned(),
      payload_json: event.data.to_json().map_err(Error::Core)?.to_string(),
      date:         encode_dt(event.date),
      user_id:      encode_uuid(event.user_id),
    })
  }

  pub fn into_domain(self) -> Result<Event> {
    let payload: serde_json::Value = serde_json::from_str(&self.payload_json)?;
    let data =
      EventData::from_parts(&self.event_code, payload).map_err(Error::Core)?;
    Ok(Event {
      event_id: decode_uuid(&self.event_id)?,
      request_id: decode_uuid(&self.request_id)?,
      data,
      date: decode_dt(&self.date)?,
      user_id: decode_uuid(&self.user_id)?,
    })
  }
}

/// Raw columns of a `timesheet_lines` row.
pub struct RawTimesheetLine {
  pub line_id:    String,
  pub request_id: String,
  pub user_id:    String,
  pub date_start: String,
  pub date_end:   Option<String>,
  pub amount:     f64,
}

impl RawTimesheetLine {
  pub fn into_domain(self) -> Result<TimesheetLine> {
    Ok(TimesheetLine {
      line_id:    decode_uuid(&self.line_id)?,
      request_id: decode_uuid(&self.request_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      date_start: decode_dt(&self.date_start)?,
      date_end:   decode_opt_dt(self.date_end)?,
      amount:     self.amount,
    })
  }
}
