//! Handlers for workflow configuration: request types, stages, and routes.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/types` | All request types |
//! | `POST`   | `/types` | Body: [`TypeBody`]; returns 201 + type |
//! | `GET`    | `/types/:id/workflow` | The materialised stage/route graph |
//! | `POST`   | `/types/:id/stages` | Body: [`StageBody`] |
//! | `POST`   | `/types/:id/routes` | Body: [`RouteBody`]; `close` follows the target stage |
//! | `DELETE` | `/stages/:id` | 422 while routes reference the stage |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use deskflow_core::{
  notify::Notifier,
  priority::{Impact, PriorityLevel, Urgency},
  store::RequestStore,
  workflow::{NotificationToggles, RequestType, Route, Stage, Workflow},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, store_err},
};

// ─── Types ───────────────────────────────────────────────────────────────────

fn default_true() -> bool { true }

/// JSON body accepted by `POST /types`.
#[derive(Debug, Deserialize)]
pub struct TypeBody {
  pub name: String,
  pub code: String,
  #[serde(default = "default_true")]
  pub active: bool,
  #[serde(default)]
  pub complex_priority: bool,
  #[serde(default)]
  pub default_priority: PriorityLevel,
  #[serde(default)]
  pub default_impact: Impact,
  #[serde(default)]
  pub default_urgency: Urgency,
  pub default_request_text: Option<String>,
  pub sequence_prefix: Option<String>,
  #[serde(default)]
  pub notify: NotificationToggles,
}

/// `POST /types`
pub async fn create_type<S, N>(
  State(state): State<ApiState<S, N>>,
  Json(body): Json<TypeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let rtype = RequestType {
    type_id: Uuid::new_v4(),
    name: body.name,
    code: body.code,
    active: body.active,
    complex_priority: body.complex_priority,
    default_priority: body.default_priority,
    default_impact: body.default_impact,
    default_urgency: body.default_urgency,
    default_request_text: body.default_request_text,
    sequence_prefix: body.sequence_prefix,
    notify: body.notify,
  };
  state
    .engine
    .store()
    .insert_request_type(&rtype)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(rtype)))
}

/// `GET /types`
pub async fn list_types<S, N>(
  State(state): State<ApiState<S, N>>,
) -> Result<Json<Vec<RequestType>>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let types = state
    .engine
    .store()
    .list_request_types()
    .await
    .map_err(store_err)?;
  Ok(Json(types))
}

/// `GET /types/:id/workflow`
pub async fn get_workflow<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Workflow>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let workflow = state
    .engine
    .store()
    .workflow(id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError(deskflow_core::Error::TypeNotFound(id)))?;
  Ok(Json(workflow))
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /types/:id/stages`.
#[derive(Debug, Deserialize)]
pub struct StageBody {
  pub name:     String,
  pub code:     String,
  pub sequence: u32,
  #[serde(default)]
  pub closed:   bool,
}

/// `POST /types/:id/stages`
pub async fn create_stage<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(type_id): Path<Uuid>,
  Json(body): Json<StageBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  // reject stages for types that do not exist
  state
    .engine
    .store()
    .get_request_type(type_id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError(deskflow_core::Error::TypeNotFound(type_id)))?;

  let stage = Stage {
    stage_id: Uuid::new_v4(),
    type_id,
    name: body.name,
    code: body.code,
    sequence: body.sequence,
    closed: body.closed,
  };
  state
    .engine
    .store()
    .insert_stage(&stage)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(stage)))
}

/// `DELETE /stages/:id`
pub async fn delete_stage<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  state
    .engine
    .store()
    .delete_stage(id)
    .await
    .map_err(store_err)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Routes ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /types/:id/routes`.
#[derive(Debug, Deserialize)]
pub struct RouteBody {
  pub name: Option<String>,
  pub stage_from: Uuid,
  pub stage_to: Uuid,
  pub default_response_text: Option<String>,
  #[serde(default)]
  pub website_published: bool,
}

/// `POST /types/:id/routes` — the route's `close` flag is taken from the
/// target stage, not the body.
pub async fn create_route<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(type_id): Path<Uuid>,
  Json(body): Json<RouteBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let workflow = state
    .engine
    .store()
    .workflow(type_id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError(deskflow_core::Error::TypeNotFound(type_id)))?;

  // both endpoints must belong to this type
  workflow.stage(body.stage_from)?;
  let target = workflow.stage(body.stage_to)?;

  let route = Route {
    route_id: Uuid::new_v4(),
    type_id,
    name: body.name,
    stage_from: body.stage_from,
    stage_to: body.stage_to,
    close: target.closed,
    default_response_text: body.default_response_text,
    website_published: body.website_published,
  };
  state
    .engine
    .store()
    .insert_route(&route)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(route)))
}
