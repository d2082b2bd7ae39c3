//! Core types and the request lifecycle engine for Deskflow.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod event;
pub mod notify;
pub mod party;
pub mod priority;
pub mod request;
pub mod retention;
pub mod store;
pub mod timesheet;
pub mod workflow;

pub use engine::Engine;
pub use error::{Error, Result};
