//! Handlers for `/parties` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/parties` | Upsert; omitting `party_id` creates a new one |
//! | `GET`  | `/parties/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use deskflow_core::{notify::Notifier, party::Party, store::RequestStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::{ApiError, store_err},
};

/// JSON body accepted by `POST /parties`.
#[derive(Debug, Deserialize)]
pub struct PartyBody {
  pub party_id: Option<Uuid>,
  pub name:     String,
  pub email:    Option<String>,
}

/// `POST /parties`
pub async fn upsert<S, N>(
  State(state): State<ApiState<S, N>>,
  Json(body): Json<PartyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let party = Party {
    party_id: body.party_id.unwrap_or_else(Uuid::new_v4),
    name:     body.name,
    email:    body.email,
  };
  state
    .engine
    .store()
    .upsert_party(&party)
    .await
    .map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(party)))
}

/// `GET /parties/:id`
pub async fn get_one<S, N>(
  State(state): State<ApiState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Party>, ApiError>
where
  S: RequestStore,
  N: Notifier,
{
  let party = state
    .engine
    .store()
    .get_party(id)
    .await
    .map_err(store_err)?
    .ok_or(ApiError(deskflow_core::Error::PartyNotFound(id)))?;
  Ok(Json(party))
}
