//! Error type for `deskflow-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] deskflow_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored code or discriminant that no domain variant matches.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The engine and HTTP layers speak [`deskflow_core::Error`]; domain
/// failures pass through untouched, backend failures collapse into the
/// opaque `Storage` variant.
impl From<Error> for deskflow_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => deskflow_core::Error::Storage(other.to_string()),
    }
  }
}
