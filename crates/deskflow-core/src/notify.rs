//! The notification boundary.
//!
//! The engine composes [`Notification`]s and hands them to a [`Notifier`];
//! templating engines, mail servers, and delivery retries all live behind
//! that trait, outside this crate. Delivery failures are logged by the
//! engine and never propagated into the lifecycle write path.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use crate::party::Party;

// ─── Notification ────────────────────────────────────────────────────────────

/// A composed message for a single recipient.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
  pub recipient:    Party,
  pub subject:      String,
  pub body:         String,
  /// The event code that triggered this notification.
  pub event_code:   &'static str,
  pub request_name: String,
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the external message sender.
pub trait Notifier: Send + Sync {
  fn send(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), NotifyError>> + Send + '_;
}

// ─── LogNotifier ─────────────────────────────────────────────────────────────

/// A [`Notifier`] that logs instead of delivering — the default for
/// deployments without a mail collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    tracing::info!(
      recipient = %notification.recipient.name,
      event = notification.event_code,
      request = %notification.request_name,
      subject = %notification.subject,
      "notification"
    );
    Ok(())
  }
}
