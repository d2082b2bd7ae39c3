//! [`SqliteStore`] — the SQLite implementation of [`RequestStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use deskflow_core::{
  event::Event,
  party::Party,
  request::Request,
  store::RequestStore,
  timesheet::TimesheetLine,
  workflow::{RequestType, Route, Stage, Workflow},
};

use crate::{
  Error, Result,
  encode::{
    RawEvent, RawParty, RawRequest, RawRequestType, RawRoute, RawStage,
    RawTimesheetLine, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── SQL fragments ───────────────────────────────────────────────────────────

const REQUEST_COLUMNS: &str = "request_id, name, type_id, stage_id, \
   category_id, priority_kind, priority_level, impact, urgency, \
   kanban_state, user_id, author_id, partner_id, request_text, \
   response_text, deadline_date, date_created, date_assigned, date_moved, \
   date_closed, created_by, moved_by, closed_by, last_route_id, version";

const TIMESHEET_COLUMNS: &str =
  "line_id, request_id, user_id, date_start, date_end, amount";

fn read_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
  Ok(RawRequest {
    request_id:     row.get(0)?,
    name:           row.get(1)?,
    type_id:        row.get(2)?,
    stage_id:       row.get(3)?,
    category_id:    row.get(4)?,
    priority_kind:  row.get(5)?,
    priority_level: row.get(6)?,
    impact:         row.get(7)?,
    urgency:        row.get(8)?,
    kanban_state:   row.get(9)?,
    user_id:        row.get(10)?,
    author_id:      row.get(11)?,
    partner_id:     row.get(12)?,
    request_text:   row.get(13)?,
    response_text:  row.get(14)?,
    deadline_date:  row.get(15)?,
    date_created:   row.get(16)?,
    date_assigned:  row.get(17)?,
    date_moved:     row.get(18)?,
    date_closed:    row.get(19)?,
    created_by:     row.get(20)?,
    moved_by:       row.get(21)?,
    closed_by:      row.get(22)?,
    last_route_id:  row.get(23)?,
    version:        row.get(24)?,
  })
}

fn read_timesheet_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawTimesheetLine> {
  Ok(RawTimesheetLine {
    line_id:    row.get(0)?,
    request_id: row.get(1)?,
    user_id:    row.get(2)?,
    date_start: row.get(3)?,
    date_end:   row.get(4)?,
    amount:     row.get(5)?,
  })
}

fn insert_event_row(
  conn: &rusqlite::Connection,
  row: &RawEvent,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO events (event_id, request_id, event_code, payload_json, \
     date, user_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      row.event_id,
      row.request_id,
      row.event_code,
      row.payload_json,
      row.date,
      row.user_id,
    ],
  )?;
  Ok(())
}

// Transaction outcomes carried out of connection closures; domain errors are
// attached lexically outside, where the request name is still around.
enum InsertOutcome {
  Inserted,
  DuplicateName,
}

enum UpdateOutcome {
  Applied,
  Missing,
  TypeChanged,
  StaleVersion,
}

enum DeleteStageOutcome {
  Deleted,
  Missing,
  HasRoutes(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Deskflow request store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = Error;

  // ── Workflow configuration ────────────────────────────────────────────

  async fn insert_request_type(&self, rtype: &RequestType) -> Result<()> {
    let type_id = encode_uuid(rtype.type_id);
    let name = rtype.name.clone();
    let code = rtype.code.clone();
    let active = rtype.active;
    let complex_priority = rtype.complex_priority;
    let default_priority = i64::from(rtype.default_priority.code());
    let default_impact = rtype.default_impact.index() as i64;
    let default_urgency = rtype.default_urgency.index() as i64;
    let default_request_text = rtype.default_request_text.clone();
    let sequence_prefix = rtype.sequence_prefix.clone();
    let notify = rtype.notify;
    let dup_name = rtype.name.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let taken: bool = conn
          .query_row(
            "SELECT 1 FROM request_types WHERE name = ?1 OR code = ?2",
            rusqlite::params![name, code],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(InsertOutcome::DuplicateName);
        }
        conn.execute(
          "INSERT INTO request_types (
             type_id, name, code, active, complex_priority,
             default_priority, default_impact, default_urgency,
             default_request_text, sequence_prefix,
             notify_created, notify_assigned, notify_closed, notify_reopened
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            type_id,
            name,
            code,
            active,
            complex_priority,
            default_priority,
            default_impact,
            default_urgency,
            default_request_text,
            sequence_prefix,
            notify.created,
            notify.assigned,
            notify.closed,
            notify.reopened,
          ],
        )?;
        Ok(InsertOutcome::Inserted)
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted => Ok(()),
      InsertOutcome::DuplicateName => Err(Error::Core(
        deskflow_core::Error::DuplicateName { name: dup_name },
      )),
    }
  }

  async fn get_request_type(&self, type_id: Uuid) -> Result<Option<RequestType>> {
    let id_str = encode_uuid(type_id);
    let raw: Option<RawRequestType> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT type_id, name, code, active, complex_priority, \
               default_priority, default_impact, default_urgency, \
               default_request_text, sequence_prefix, notify_created, \
               notify_assigned, notify_closed, notify_reopened \
               FROM request_types WHERE type_id = ?1",
              rusqlite::params![id_str],
              read_request_type_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRequestType::into_domain).transpose()
  }

  async fn list_request_types(&self) -> Result<Vec<RequestType>> {
    let raws: Vec<RawRequestType> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT type_id, name, code, active, complex_priority, \
           default_priority, default_impact, default_urgency, \
           default_request_text, sequence_prefix, notify_created, \
           notify_assigned, notify_closed, notify_reopened \
           FROM request_types ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], read_request_type_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRequestType::into_domain).collect()
  }

  async fn insert_stage(&self, stage: &Stage) -> Result<()> {
    let stage_id = encode_uuid(stage.stage_id);
    let type_id = encode_uuid(stage.type_id);
    let name = stage.name.clone();
    let code = stage.code.clone();
    let sequence = i64::from(stage.sequence);
    let closed = stage.closed;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stages (stage_id, type_id, name, code, sequence, closed)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![stage_id, type_id, name, code, sequence, closed],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_stage(&self, stage_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(stage_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let name: Option<String> = tx
          .query_row(
            "SELECT name FROM stages WHERE stage_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(name) = name else {
          return Ok(DeleteStageOutcome::Missing);
        };
        let referencing: i64 = tx.query_row(
          "SELECT COUNT(*) FROM routes WHERE stage_from = ?1 OR stage_to = ?1",
          rusqlite::params![id_str],
          |r| r.get(0),
        )?;
        if referencing > 0 {
          return Ok(DeleteStageOutcome::HasRoutes(name));
        }
        tx.execute(
          "DELETE FROM stages WHERE stage_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(DeleteStageOutcome::Deleted)
      })
      .await?;

    match outcome {
      DeleteStageOutcome::Deleted => Ok(()),
      DeleteStageOutcome::Missing => {
        Err(Error::Core(deskflow_core::Error::StageNotFound(stage_id)))
      }
      DeleteStageOutcome::HasRoutes(stage) => {
        Err(Error::Core(deskflow_core::Error::StageHasRoutes { stage }))
      }
    }
  }

  async fn insert_route(&self, route: &Route) -> Result<()> {
    let route_id = encode_uuid(route.route_id);
    let type_id = encode_uuid(route.type_id);
    let name = route.name.clone();
    let stage_from = encode_uuid(route.stage_from);
    let stage_to = encode_uuid(route.stage_to);
    let close = route.close;
    let default_response_text = route.default_response_text.clone();
    let website_published = route.website_published;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO routes (
             route_id, type_id, name, stage_from, stage_to, close,
             default_response_text, website_published
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            route_id,
            type_id,
            name,
            stage_from,
            stage_to,
            close,
            default_response_text,
            website_published,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn workflow(&self, type_id: Uuid) -> Result<Option<Workflow>> {
    let id_str = encode_uuid(type_id);

    let raw: Option<(RawRequestType, Vec<RawStage>, Vec<RawRoute>)> = self
      .conn
      .call(move |conn| {
        let rtype: Option<RawRequestType> = conn
          .query_row(
            "SELECT type_id, name, code, active, complex_priority, \
             default_priority, default_impact, default_urgency, \
             default_request_text, sequence_prefix, notify_created, \
             notify_assigned, notify_closed, notify_reopened \
             FROM request_types WHERE type_id = ?1",
            rusqlite::params![id_str],
            read_request_type_row,
          )
          .optional()?;
        let Some(rtype) = rtype else { return Ok(None) };

        let mut stmt = conn.prepare(
          "SELECT stage_id, type_id, name, code, sequence, closed
           FROM stages WHERE type_id = ?1 ORDER BY sequence",
        )?;
        let stages = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawStage {
              stage_id: row.get(0)?,
              type_id:  row.get(1)?,
              name:     row.get(2)?,
              code:     row.get(3)?,
              sequence: row.get(4)?,
              closed:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT route_id, type_id, name, stage_from, stage_to, close, \
           default_response_text, website_published
           FROM routes WHERE type_id = ?1",
        )?;
        let routes = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawRoute {
              route_id:              row.get(0)?,
              type_id:               row.get(1)?,
              name:                  row.get(2)?,
              stage_from:            row.get(3)?,
              stage_to:              row.get(4)?,
              close:                 row.get(5)?,
              default_response_text: row.get(6)?,
              website_published:     row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((rtype, stages, routes)))
      })
      .await?;

    let Some((rtype, stages, routes)) = raw else {
      return Ok(None);
    };
    Ok(Some(Workflow {
      request_type: rtype.into_domain()?,
      stages:       stages
        .into_iter()
        .map(RawStage::into_domain)
        .collect::<Result<_>>()?,
      routes:       routes
        .into_iter()
        .map(RawRoute::into_domain)
        .collect::<Result<_>>()?,
    }))
  }

  // ── Parties ───────────────────────────────────────────────────────────

  async fn upsert_party(&self, party: &Party) -> Result<()> {
    let party_id = encode_uuid(party.party_id);
    let name = party.name.clone();
    let email = party.email.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO parties (party_id, name, email) VALUES (?1, ?2, ?3)
           ON CONFLICT(party_id) DO UPDATE
           SET name = excluded.name, email = excluded.email",
          rusqlite::params![party_id, name, email],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_party(&self, party_id: Uuid) -> Result<Option<Party>> {
    let id_str = encode_uuid(party_id);
    let raw: Option<RawParty> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT party_id, name, email FROM parties WHERE party_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawParty {
                  party_id: row.get(0)?,
                  name:     row.get(1)?,
                  email:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawParty::into_domain).transpose()
  }

  // ── Requests ──────────────────────────────────────────────────────────

  async fn insert_request(&self, request: &Request, event: &Event) -> Result<()> {
    let row = RawRequest::from_domain(request);
    let ev = RawEvent::from_domain(event)?;
    let dup_name = request.name.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM requests WHERE name = ?1",
            rusqlite::params![row.name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(InsertOutcome::DuplicateName);
        }
        tx.execute(
          "INSERT INTO requests (
             request_id, name, type_id, stage_id, category_id,
             priority_kind, priority_level, impact, urgency, kanban_state,
             user_id, author_id, partner_id, request_text, response_text,
             deadline_date, date_created, date_assigned, date_moved,
             date_closed, created_by, moved_by, closed_by, last_route_id,
             version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, \
             ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
          rusqlite::params![
            row.request_id,
            row.name,
            row.type_id,
            row.stage_id,
            row.category_id,
            row.priority_kind,
            row.priority_level,
            row.impact,
            row.urgency,
            row.kanban_state,
            row.user_id,
            row.author_id,
            row.partner_id,
            row.request_text,
            row.response_text,
            row.deadline_date,
            row.date_created,
            row.date_assigned,
            row.date_moved,
            row.date_closed,
            row.created_by,
            row.moved_by,
            row.closed_by,
            row.last_route_id,
            row.version,
          ],
        )?;
        insert_event_row(&tx, &ev)?;
        tx.commit()?;
        Ok(InsertOutcome::Inserted)
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted => Ok(()),
      InsertOutcome::DuplicateName => Err(Error::Core(
        deskflow_core::Error::DuplicateName { name: dup_name },
      )),
    }
  }

  async fn get_request(&self, request_id: Uuid) -> Result<Option<Request>> {
    let id_str = encode_uuid(request_id);
    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = ?1"
              ),
              rusqlite::params![id_str],
              read_request_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRequest::into_domain).transpose()
  }

  async fn get_request_by_name(&self, name: &str) -> Result<Option<Request>> {
    let name = name.to_owned();
    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE name = ?1"),
              rusqlite::params![name],
              read_request_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawRequest::into_domain).transpose()
  }

  async fn list_requests(&self) -> Result<Vec<Request>> {
    let raws: Vec<RawRequest> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM requests ORDER BY date_created DESC"
        ))?;
        let rows = stmt
          .query_map([], read_request_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRequest::into_domain).collect()
  }

  async fn update_request(
    &self,
    request: &Request,
    expected_version: u64,
    events: &[Event],
  ) -> Result<()> {
    let row = RawRequest::from_domain(request);
    let ev_rows = events
      .iter()
      .map(RawEvent::from_domain)
      .collect::<Result<Vec<_>>>()?;
    let expected = expected_version as i64;
    let name = request.name.clone();
    let request_id = request.request_id;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let stored: Option<(String, i64)> = tx
          .query_row(
            "SELECT type_id, version FROM requests WHERE request_id = ?1",
            rusqlite::params![row.request_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((stored_type, stored_version)) = stored else {
          return Ok(UpdateOutcome::Missing);
        };
        if stored_type != row.type_id {
          return Ok(UpdateOutcome::TypeChanged);
        }
        if stored_version != expected {
          return Ok(UpdateOutcome::StaleVersion);
        }

        tx.execute(
          "UPDATE requests SET
             stage_id = ?2, category_id = ?3, priority_kind = ?4,
             priority_level = ?5, impact = ?6, urgency = ?7,
             kanban_state = ?8, user_id = ?9, partner_id = ?10,
             request_text = ?11, response_text = ?12, deadline_date = ?13,
             date_assigned = ?14, date_moved = ?15, date_closed = ?16,
             moved_by = ?17, closed_by = ?18, last_route_id = ?19,
             version = ?20
           WHERE request_id = ?1 AND version = ?21",
          rusqlite::params![
            row.request_id,
            row.stage_id,
            row.category_id,
            row.priority_kind,
            row.priority_level,
            row.impact,
            row.urgency,
            row.kanban_state,
            row.user_id,
            row.partner_id,
            row.request_text,
            row.response_text,
            row.deadline_date,
            row.date_assigned,
            row.date_moved,
            row.date_closed,
            row.moved_by,
            row.closed_by,
            row.last_route_id,
            row.version,
            expected,
          ],
        )?;
        for ev in &ev_rows {
          insert_event_row(&tx, ev)?;
        }
        tx.commit()?;
        Ok(UpdateOutcome::Applied)
      })
      .await?;

    match outcome {
      UpdateOutcome::Applied => Ok(()),
      UpdateOutcome::Missing => {
        Err(Error::Core(deskflow_core::Error::RequestNotFound(request_id)))
      }
      UpdateOutcome::TypeChanged => {
        Err(Error::Core(deskflow_core::Error::ImmutableType { request: name }))
      }
      UpdateOutcome::StaleVersion => {
        Err(Error::Core(deskflow_core::Error::Conflict { request: name }))
      }
    }
  }

  // ── Events ────────────────────────────────────────────────────────────

  async fn events_for_request(&self, request_id: Uuid) -> Result<Vec<Event>> {
    let id_str = encode_uuid(request_id);
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, request_id, event_code, payload_json, date, user_id
           FROM events WHERE request_id = ?1
           ORDER BY date DESC, seq DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawEvent {
              event_id:     row.get(0)?,
              request_id:   row.get(1)?,
              event_code:   row.get(2)?,
              payload_json: row.get(3)?,
              date:         row.get(4)?,
              user_id:      row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawEvent::into_domain).collect()
  }

  async fn vacuum_events(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let cutoff_str = encode_dt(cutoff);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM events WHERE date < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(deleted)
  }

  // ── Sequences ─────────────────────────────────────────────────────────

  async fn next_name(&self, prefix: &str) -> Result<String> {
    let prefix = prefix.to_owned();
    let prefix_out = prefix.clone();
    let value: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO sequences (prefix, value) VALUES (?1, 1)
           ON CONFLICT(prefix) DO UPDATE SET value = value + 1
           RETURNING value",
          rusqlite::params![prefix],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(format!("{prefix_out}-{value:05}"))
  }

  // ── Timesheets ────────────────────────────────────────────────────────

  async fn insert_timesheet_line(
    &self,
    line: &TimesheetLine,
    event: &Event,
  ) -> Result<()> {
    let line_id = encode_uuid(line.line_id);
    let request_id = encode_uuid(line.request_id);
    let user_id = encode_uuid(line.user_id);
    let date_start = encode_dt(line.date_start);
    let date_end = line.date_end.map(encode_dt);
    let amount = line.amount;
    let ev = RawEvent::from_domain(event)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO timesheet_lines (
             line_id, request_id, user_id, date_start, date_end, amount
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            line_id, request_id, user_id, date_start, date_end, amount
          ],
        )?;
        insert_event_row(&tx, &ev)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn close_timesheet_line(
    &self,
    line: &TimesheetLine,
    event: &Event,
  ) -> Result<()> {
    let line_id = encode_uuid(line.line_id);
    let date_end = line.date_end.map(encode_dt);
    let amount = line.amount;
    let ev = RawEvent::from_domain(event)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE timesheet_lines SET date_end = ?2, amount = ?3
           WHERE line_id = ?1",
          rusqlite::params![line_id, date_end, amount],
        )?;
        insert_event_row(&tx, &ev)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn running_line_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Option<TimesheetLine>> {
    let id_str = encode_uuid(user_id);
    let raw: Option<RawTimesheetLine> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TIMESHEET_COLUMNS} FROM timesheet_lines
                 WHERE user_id = ?1 AND date_end IS NULL"
              ),
              rusqlite::params![id_str],
              read_timesheet_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTimesheetLine::into_domain).transpose()
  }

  async fn timesheet_lines_for_request(
    &self,
    request_id: Uuid,
  ) -> Result<Vec<TimesheetLine>> {
    let id_str = encode_uuid(request_id);
    let raws: Vec<RawTimesheetLine> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TIMESHEET_COLUMNS} FROM timesheet_lines
           WHERE request_id = ?1 ORDER BY date_start"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_timesheet_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawTimesheetLine::into_domain).collect()
  }
}

fn read_request_type_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawRequestType> {
  Ok(RawRequestType {
    type_id:              row.get(0)?,
    name:                 row.get(1)?,
    code:                 row.get(2)?,
    active:               row.get(3)?,
    complex_priority:     row.get(4)?,
    default_priority:     row.get(5)?,
    default_impact:       row.get(6)?,
    default_urgency:      row.get(7)?,
    default_request_text: row.get(8)?,
    sequence_prefix:      row.get(9)?,
    notify_created:       row.get(10)?,
    notify_assigned:      row.get(11)?,
    notify_closed:        row.get(12)?,
    notify_reopened:      row.get(13)?,
  })
}
