//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use deskflow_core::Error;
use serde_json::json;

/// An error returned by an API handler — a thin wrapper that maps the
/// domain error taxonomy onto HTTP status codes.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
  fn from(e: Error) -> Self { Self(e) }
}

/// Adapter for raw store calls, whose error type converts into the domain
/// taxonomy rather than being it.
pub(crate) fn store_err<E: Into<Error>>(e: E) -> ApiError { ApiError(e.into()) }

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      Error::RequestNotFound(_)
      | Error::TypeNotFound(_)
      | Error::StageNotFound(_)
      | Error::PartyNotFound(_) => StatusCode::NOT_FOUND,

      Error::NoStartStage { .. }
      | Error::InvalidTransition { .. }
      | Error::ImmutableType { .. }
      | Error::StageHasRoutes { .. }
      | Error::RequestClosed { .. }
      | Error::WorkAlreadyStarted(_)
      | Error::NoRunningWork(_) => StatusCode::UNPROCESSABLE_ENTITY,

      Error::Conflict { .. } | Error::DuplicateName { .. } => {
        StatusCode::CONFLICT
      }

      Error::Serialization(_) | Error::Storage(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    };
    (status, Json(json!({ "error": self.0.to_string() }))).into_response()
  }
}
