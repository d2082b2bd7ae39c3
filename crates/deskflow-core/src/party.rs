//! Parties — the people a request touches.
//!
//! A party is the contact identity used for notification routing: request
//! authors, assignees, and related partners. Delivery details beyond an email
//! address live with the external mail collaborator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
  pub party_id: Uuid,
  pub name:     String,
  /// Parties without an email are silently skipped by the notification
  /// dispatcher.
  pub email:    Option<String>,
}
