//! The `RequestStore` trait.
//!
//! Implemented by storage backends (e.g. `deskflow-store-sqlite`). The engine
//! and the HTTP layer depend on this abstraction, not on any concrete
//! backend.
//!
//! Atomicity contract: a request write and the events it produced are one
//! transaction — either both are durable or neither is. The store enforces
//! name uniqueness, type immutability, and version-based conflict detection;
//! those failures surface as the corresponding [`crate::Error`] variants
//! through the `Into<Error>` bound on the backend error type.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  event::Event,
  party::Party,
  request::Request,
  timesheet::TimesheetLine,
  workflow::{Route, Stage, RequestType, Workflow},
};

/// Abstraction over a Deskflow storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Workflow configuration ────────────────────────────────────────────

  /// Persist a new request type.
  fn insert_request_type<'a>(
    &'a self,
    rtype: &'a RequestType,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_request_type(
    &self,
    type_id: Uuid,
  ) -> impl Future<Output = Result<Option<RequestType>, Self::Error>> + Send + '_;

  fn list_request_types(
    &self,
  ) -> impl Future<Output = Result<Vec<RequestType>, Self::Error>> + Send + '_;

  fn insert_stage<'a>(
    &'a self,
    stage: &'a Stage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete a stage. Fails with [`crate::Error::StageHasRoutes`] while any
  /// route still references it.
  fn delete_stage(
    &self,
    stage_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_route<'a>(
    &'a self,
    route: &'a Route,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Materialise the stage/route graph for one type. `None` when the type
  /// does not exist.
  fn workflow(
    &self,
    type_id: Uuid,
  ) -> impl Future<Output = Result<Option<Workflow>, Self::Error>> + Send + '_;

  // ── Parties ───────────────────────────────────────────────────────────

  fn upsert_party<'a>(
    &'a self,
    party: &'a Party,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_party(
    &self,
    party_id: Uuid,
  ) -> impl Future<Output = Result<Option<Party>, Self::Error>> + Send + '_;

  // ── Requests ──────────────────────────────────────────────────────────

  /// Persist a freshly created request together with its `created` event,
  /// in one transaction. Fails with [`crate::Error::DuplicateName`] when
  /// the name is taken.
  fn insert_request<'a>(
    &'a self,
    request: &'a Request,
    event: &'a Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + '_;

  fn get_request_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + 'a;

  fn list_requests(
    &self,
  ) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + '_;

  /// Persist an updated request plus the events the change produced, in one
  /// transaction. The row is only written when its stored version equals
  /// `expected_version`; a mismatch fails with [`crate::Error::Conflict`].
  /// A changed `type_id` fails with [`crate::Error::ImmutableType`].
  fn update_request<'a>(
    &'a self,
    request: &'a Request,
    expected_version: u64,
    events: &'a [Event],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Events ────────────────────────────────────────────────────────────

  /// All events of a request, ordered `(date DESC, insert sequence DESC)`.
  fn events_for_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Delete all events dated strictly before `cutoff`; returns the count.
  /// Idempotent; deleting nothing is not an error.
  fn vacuum_events(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Sequences ─────────────────────────────────────────────────────────

  /// Atomically draw the next name from the sequence for `prefix`, e.g.
  /// `"REQ" -> "REQ-00042"`. Two concurrent calls never return the same
  /// name.
  fn next_name<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  // ── Timesheets ────────────────────────────────────────────────────────

  /// Persist a newly opened timesheet line plus its start event, in one
  /// transaction.
  fn insert_timesheet_line<'a>(
    &'a self,
    line: &'a TimesheetLine,
    event: &'a Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Persist a stopped timesheet line plus its stop event, in one
  /// transaction.
  fn close_timesheet_line<'a>(
    &'a self,
    line: &'a TimesheetLine,
    event: &'a Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The running (not yet stopped) line for a user, if any.
  fn running_line_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<TimesheetLine>, Self::Error>> + Send + '_;

  fn timesheet_lines_for_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TimesheetLine>, Self::Error>> + Send + '_;
}
