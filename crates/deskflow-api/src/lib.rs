//! JSON REST API for Deskflow.
//!
//! Exposes an axum [`Router`] backed by any
//! [`deskflow_core::store::RequestStore`] behind an
//! [`Engine`](deskflow_core::Engine). Auth, TLS, and transport concerns are
//! the caller's responsibility; mutating endpoints carry the acting user as
//! an `actor_id` field in the body.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", deskflow_api::api_router(engine.clone(), retention))
//! ```

pub mod error;
pub mod parties;
pub mod requests;
pub mod vacuum;
pub mod workflow;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use deskflow_core::{
  Engine, notify::Notifier, retention::RetentionPolicy, store::RequestStore,
};

pub use error::ApiError;

/// Shared handler state: the engine plus the retention policy the vacuum
/// endpoint applies.
pub struct ApiState<S, N> {
  pub engine:    Arc<Engine<S, N>>,
  pub retention: RetentionPolicy,
}

impl<S, N> Clone for ApiState<S, N> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone(), retention: self.retention }
  }
}

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(
  engine: Arc<Engine<S, N>>,
  retention: RetentionPolicy,
) -> Router<()>
where
  S: RequestStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    // Requests
    .route(
      "/requests",
      get(requests::list::<S, N>).post(requests::create::<S, N>),
    )
    .route("/requests/{id}", get(requests::get_one::<S, N>))
    .route("/requests/{id}/stage", post(requests::set_stage::<S, N>))
    .route("/requests/{id}/assign", post(requests::assign::<S, N>))
    .route("/requests/{id}/text", post(requests::set_text::<S, N>))
    .route("/requests/{id}/category", post(requests::set_category::<S, N>))
    .route("/requests/{id}/deadline", post(requests::set_deadline::<S, N>))
    .route("/requests/{id}/priority", post(requests::set_priority::<S, N>))
    .route("/requests/{id}/kanban", post(requests::set_kanban::<S, N>))
    .route("/requests/{id}/start-work", post(requests::start_work::<S, N>))
    .route("/requests/{id}/stop-work", post(requests::stop_work::<S, N>))
    .route("/requests/{id}/events", get(requests::events::<S, N>))
    .route("/requests/{id}/timesheets", get(requests::timesheets::<S, N>))
    // Workflow configuration
    .route(
      "/types",
      get(workflow::list_types::<S, N>).post(workflow::create_type::<S, N>),
    )
    .route("/types/{id}/workflow", get(workflow::get_workflow::<S, N>))
    .route("/types/{id}/stages", post(workflow::create_stage::<S, N>))
    .route("/types/{id}/routes", post(workflow::create_route::<S, N>))
    .route("/stages/{id}", delete(workflow::delete_stage::<S, N>))
    // Parties
    .route("/parties", post(parties::upsert::<S, N>))
    .route("/parties/{id}", get(parties::get_one::<S, N>))
    // Maintenance
    .route("/vacuum", post(vacuum::run::<S, N>))
    .with_state(ApiState { engine, retention })
}
