//! Handler for `POST /vacuum` — the event retention sweep.
//!
//! Invoked by an external scheduler (cron, systemd timer). The retention
//! policy comes from server configuration; the optional `days` body field is
//! a deprecated per-call override kept for older cron setups.

use axum::{Json, extract::State};
use deskflow_core::{notify::Notifier, store::RequestStore};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiState, error::ApiError};

/// JSON body accepted by `POST /vacuum`.
#[derive(Debug, Default, Deserialize)]
pub struct VacuumBody {
  pub days: Option<u32>,
}

/// `POST /vacuum`
pub async fn run<S, N>(
  State(state): State<ApiState<S, N>>,
  body: Option<Json<VacuumBody>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let days = body.and_then(|Json(b)| b.days);
  let deleted = state.engine.vacuum_events(&state.retention, days).await?;
  Ok(Json(json!({ "deleted": deleted })))
}
