//! Handlers for `/requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/requests` | All requests, newest first |
//! | `POST` | `/requests` | Body: [`CreateBody`]; returns 201 + request |
//! | `GET`  | `/requests/:id` | 404 if not found |
//! | `POST` | `/requests/:id/stage` | Move along a configured route |
//! | `POST` | `/requests/:id/assign` | `user_id: null` unassigns |
//! | `POST` | `/requests/:id/text`, `/category`, `/deadline`, `/priority`, `/kanban` | Tracked field changes |
//! | `POST` | `/requests/:id/start-work`, `:id/stop-work` | Time tracking |
//! | `GET`  | `/requests/:id/events` | Event log, newest first |
//! | `GET`  | `/requests/:id/timesheets` | Timesheet lines |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use deskflow_core::{
  event::Event,
  notify::Notifier,
  priority::PriorityUpdate,
  request::{KanbanState, NewRequest, Request},
  store::RequestStore,
  timesheet::TimesheetLine,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, store_err},
};

// ─── List / get ──────────────────────────────────────────────────────────────

/// `GET /requests`
pub async fn list<S, N>(
  State(state): State<ApiState<S, N>>,
) -> Result<Json<Vec<Request>>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let requests = state
    .engine
    .store()
    .list_requests()
    .await
    .map_err(store_err)?;
  Ok(Json(requests))
}

/// `GET /requests/:id`
pub async fn get_one<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .store()
    .get_request(id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError(deskflow_core::Error::RequestNotFound(id)))?;
  Ok(Json(request))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /requests`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub actor_id: Uuid,
  #[serde(flatten)]
  pub request:  NewRequest,
}

/// `POST /requests`
pub async fn create<S, N>(
  State(state): State<ApiState<S, N>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .create_request(body.request, body.actor_id)
    .await?;
  Ok((StatusCode::CREATED, Json(request)))
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StageBody {
  pub stage_id: Uuid,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/stage`
pub async fn set_stage<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StageBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_stage(id, body.stage_id, body.actor_id)
    .await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  /// `null` (or absent) unassigns.
  pub user_id:  Option<Uuid>,
  pub comment:  Option<String>,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/assign`
pub async fn assign<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_assignee(id, body.user_id, body.comment, body.actor_id)
    .await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
  pub text:     String,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/text`
pub async fn set_text<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<TextBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state.engine.set_text(id, body.text, body.actor_id).await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
  pub category_id: Option<Uuid>,
  pub actor_id:    Uuid,
}

/// `POST /requests/:id/category`
pub async fn set_category<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CategoryBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_category(id, body.category_id, body.actor_id)
    .await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct DeadlineBody {
  pub deadline: Option<NaiveDate>,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/deadline`
pub async fn set_deadline<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DeadlineBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_deadline(id, body.deadline, body.actor_id)
    .await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct PriorityBody {
  #[serde(flatten)]
  pub update:   PriorityUpdate,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/priority` — any of `priority`, `impact`, `urgency`.
pub async fn set_priority<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PriorityBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_priority_fields(id, body.update, body.actor_id)
    .await?;
  Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct KanbanBody {
  pub state:    KanbanState,
  pub actor_id: Uuid,
}

/// `POST /requests/:id/kanban`
pub async fn set_kanban<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<KanbanBody>,
) -> Result<Json<Request>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let request = state
    .engine
    .set_kanban_state(id, body.state, body.actor_id)
    .await?;
  Ok(Json(request))
}

// ─── Time tracking ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActorBody {
  pub actor_id: Uuid,
}

/// `POST /requests/:id/start-work`
pub async fn start_work<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActorBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let line = state.engine.start_work(id, body.actor_id).await?;
  Ok((StatusCode::CREATED, Json(line)))
}

/// `POST /requests/:id/stop-work`
pub async fn stop_work<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActorBody>,
) -> Result<Json<TimesheetLine>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let line = state.engine.stop_work(id, body.actor_id).await?;
  Ok(Json(line))
}

/// `GET /requests/:id/timesheets`
pub async fn timesheets<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TimesheetLine>>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let lines = state
    .engine
    .store()
    .timesheet_lines_for_request(id)
    .await
    .map_err(store_err)?;
  Ok(Json(lines))
}

// ─── Event log ───────────────────────────────────────────────────────────────

/// `GET /requests/:id/events`
pub async fn events<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let events = state.engine.events_for_request(id).await?;
  Ok(Json(events))
}
