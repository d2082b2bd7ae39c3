//! Error types for `deskflow-core`.
//!
//! Every user-facing variant names the request, stage, or type it concerns so
//! an operator can tell which transition failed without extra digging.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("request type not found: {0}")]
  TypeNotFound(Uuid),

  #[error("stage not found: {0}")]
  StageNotFound(Uuid),

  #[error("party not found: {0}")]
  PartyNotFound(Uuid),

  #[error("cannot create request of type {type_name:?}: no start stage defined")]
  NoStartStage { type_name: String },

  #[error("request {request:?}: no route from stage {from} to stage {to}")]
  InvalidTransition {
    request: String,
    from:    Uuid,
    to:      Uuid,
  },

  #[error("request {request:?}: type cannot be changed after creation")]
  ImmutableType { request: String },

  #[error("stage {stage:?} is referenced by routes and cannot be deleted")]
  StageHasRoutes { stage: String },

  #[error("request {request:?} was modified concurrently; retry with fresh state")]
  Conflict { request: String },

  #[error("request name {name:?} already exists")]
  DuplicateName { name: String },

  #[error("request {request:?} is closed")]
  RequestClosed { request: String },

  #[error("user {0} already has a running timesheet line")]
  WorkAlreadyStarted(Uuid),

  #[error("user {0} has no running timesheet line")]
  NoRunningWork(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Opaque backend failure surfaced through the [`crate::store::RequestStore`]
  /// boundary.
  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
