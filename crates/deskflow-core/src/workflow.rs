//! Request types, stages, routes, and the per-type workflow graph.
//!
//! Types, stages, and routes are administrator-managed configuration: created
//! rarely, never auto-deleted. A [`Workflow`] is the materialised graph for
//! one request type, used by the engine to validate stage transitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  priority::{Impact, PriorityLevel, Urgency},
};

// ─── Request type ────────────────────────────────────────────────────────────

/// Per-type toggles for the default notifications sent on request events.
/// `assigned` covers reassignment as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationToggles {
  pub created:  bool,
  pub assigned: bool,
  pub closed:   bool,
  pub reopened: bool,
}

impl Default for NotificationToggles {
  fn default() -> Self {
    Self { created: true, assigned: true, closed: true, reopened: true }
  }
}

/// A category of ticket. Owns an ordered set of stages and a set of routes;
/// carries the defaults applied to newly created requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestType {
  pub type_id: Uuid,
  /// Unique human-readable name.
  pub name:    String,
  /// Unique machine code, e.g. `"incident"`.
  pub code:    String,
  pub active:  bool,

  /// When set, users pick impact and urgency and the priority is derived;
  /// otherwise they pick a priority level directly.
  pub complex_priority: bool,
  pub default_priority: PriorityLevel,
  pub default_impact:   Impact,
  pub default_urgency:  Urgency,

  pub default_request_text: Option<String>,
  /// Prefix for generated request names, e.g. `"RSR"`. Falls back to the
  /// global default when unset.
  pub sequence_prefix:      Option<String>,

  pub notify: NotificationToggles,
}

// ─── Stage ───────────────────────────────────────────────────────────────────

/// A named state a request of one type can occupy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
  pub stage_id: Uuid,
  pub type_id:  Uuid,
  pub name:     String,
  pub code:     String,
  /// Ordering; the stage with the lowest sequence is the start stage.
  pub sequence: u32,
  /// Terminal (closing) state. Not absorbing — routes may lead back out.
  pub closed:   bool,
}

// ─── Route ───────────────────────────────────────────────────────────────────

/// A directed allowed transition between two stages of one request type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
  pub route_id:   Uuid,
  pub type_id:    Uuid,
  pub name:       Option<String>,
  pub stage_from: Uuid,
  pub stage_to:   Uuid,
  /// Mirrors `stage_to.closed`; set when the route is added.
  pub close:      bool,

  pub default_response_text: Option<String>,
  /// Whether this transition is exposed to external (website) users.
  pub website_published:     bool,
}

// ─── Workflow ────────────────────────────────────────────────────────────────

/// The stage/route graph of one request type, materialised by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
  pub request_type: RequestType,
  pub stages:       Vec<Stage>,
  pub routes:       Vec<Route>,
}

impl Workflow {
  /// The stage with the lowest `sequence`, or `None` for a type with no
  /// stages. New requests always start here.
  pub fn start_stage(&self) -> Option<&Stage> {
    self.stages.iter().min_by_key(|s| s.sequence)
  }

  /// Look up a stage of this workflow by id.
  pub fn stage(&self, stage_id: Uuid) -> Result<&Stage> {
    self
      .stages
      .iter()
      .find(|s| s.stage_id == stage_id)
      .ok_or(Error::StageNotFound(stage_id))
  }

  /// The unique route `from -> to`, or [`Error::InvalidTransition`].
  ///
  /// Duplicate routes for the same edge are a configuration error; we log a
  /// warning and pick the lowest route id so the choice is deterministic.
  pub fn ensure_route(
    &self,
    request_name: &str,
    from: Uuid,
    to: Uuid,
  ) -> Result<&Route> {
    let mut matches: Vec<&Route> = self
      .routes
      .iter()
      .filter(|r| r.stage_from == from && r.stage_to == to)
      .collect();

    match matches.len() {
      0 => Err(Error::InvalidTransition {
        request: request_name.to_owned(),
        from,
        to,
      }),
      1 => Ok(matches[0]),
      n => {
        tracing::warn!(
          request = request_name,
          %from,
          %to,
          count = n,
          "multiple routes match a single transition; picking lowest id"
        );
        matches.sort_by_key(|r| r.route_id);
        Ok(matches[0])
      }
    }
  }

  /// Whether any outgoing route from `stage_id` leads to a closed stage.
  pub fn can_be_closed(&self, stage_id: Uuid) -> bool {
    self
      .routes
      .iter()
      .any(|r| r.stage_from == stage_id && r.close)
  }

  /// Stages reachable from `stage_id` in one transition.
  pub fn next_stages(&self, stage_id: Uuid) -> Vec<&Stage> {
    self
      .routes
      .iter()
      .filter(|r| r.stage_from == stage_id)
      .filter_map(|r| self.stage(r.stage_to).ok())
      .collect()
  }

  /// Display name for a route: its own name when set, otherwise
  /// `"From -> To"` built from the stage names.
  pub fn route_display_name(&self, route: &Route) -> String {
    if let Some(name) = &route.name {
      return name.clone();
    }
    let from = self
      .stage(route.stage_from)
      .map(|s| s.name.as_str())
      .unwrap_or("?");
    let to = self
      .stage(route.stage_to)
      .map(|s| s.name.as_str())
      .unwrap_or("?");
    format!("{from} -> {to}")
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn rtype(type_id: Uuid) -> RequestType {
    RequestType {
      type_id,
      name: "Incident".into(),
      code: "incident".into(),
      active: true,
      complex_priority: false,
      default_priority: PriorityLevel::Medium,
      default_impact: Impact::Medium,
      default_urgency: Urgency::Medium,
      default_request_text: None,
      sequence_prefix: None,
      notify: NotificationToggles::default(),
    }
  }

  fn stage(type_id: Uuid, name: &str, sequence: u32, closed: bool) -> Stage {
    Stage {
      stage_id: Uuid::new_v4(),
      type_id,
      name: name.into(),
      code: name.to_lowercase(),
      sequence,
      closed,
    }
  }

  fn route(type_id: Uuid, from: &Stage, to: &Stage) -> Route {
    Route {
      route_id: Uuid::new_v4(),
      type_id,
      name: None,
      stage_from: from.stage_id,
      stage_to: to.stage_id,
      close: to.closed,
      default_response_text: None,
      website_published: false,
    }
  }

  fn workflow() -> Workflow {
    let type_id = Uuid::new_v4();
    let draft = stage(type_id, "Draft", 10, false);
    let sent = stage(type_id, "Sent", 5, false);
    let confirmed = stage(type_id, "Confirmed", 20, false);
    let routes = vec![
      route(type_id, &sent, &draft),
      route(type_id, &draft, &confirmed),
    ];
    Workflow {
      request_type: rtype(type_id),
      stages:       vec![draft, sent, confirmed],
      routes,
    }
  }

  #[test]
  fn start_stage_is_lowest_sequence() {
    let wf = workflow();
    // sequences are {10, 5, 20}; the stage with sequence 5 wins
    assert_eq!(wf.start_stage().unwrap().sequence, 5);
    assert_eq!(wf.start_stage().unwrap().name, "Sent");
  }

  #[test]
  fn start_stage_none_without_stages() {
    let type_id = Uuid::new_v4();
    let wf = Workflow {
      request_type: rtype(type_id),
      stages:       vec![],
      routes:       vec![],
    };
    assert!(wf.start_stage().is_none());
  }

  #[test]
  fn ensure_route_finds_configured_edge() {
    let wf = workflow();
    let sent = wf.stages[1].stage_id;
    let draft = wf.stages[0].stage_id;
    let route = wf.ensure_route("Req-1", sent, draft).unwrap();
    assert_eq!(route.stage_from, sent);
    assert_eq!(route.stage_to, draft);
  }

  #[test]
  fn ensure_route_rejects_missing_edge() {
    let wf = workflow();
    let sent = wf.stages[1].stage_id;
    let confirmed = wf.stages[2].stage_id;
    let err = wf.ensure_route("Req-1", sent, confirmed).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  #[test]
  fn duplicate_routes_resolve_to_lowest_id() {
    let mut wf = workflow();
    let first = wf.routes[1].clone();
    let mut second = first.clone();
    second.route_id = Uuid::new_v4();
    wf.routes.push(second.clone());

    let expected = first.route_id.min(second.route_id);
    let picked = wf
      .ensure_route("Req-1", first.stage_from, first.stage_to)
      .unwrap();
    assert_eq!(picked.route_id, expected);
  }

  #[test]
  fn next_stages_lists_reachable_stages() {
    let wf = workflow();
    let draft = wf.stages[0].stage_id;
    let next = wf.next_stages(draft);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].name, "Confirmed");
    assert!(wf.next_stages(wf.stages[2].stage_id).is_empty());
  }

  #[test]
  fn route_display_name_falls_back_to_stage_names() {
    let wf = workflow();
    let named = Route {
      name: Some("Send".into()),
      ..wf.routes[0].clone()
    };
    assert_eq!(wf.route_display_name(&named), "Send");
    assert_eq!(wf.route_display_name(&wf.routes[0]), "Sent -> Draft");
  }

  #[test]
  fn can_be_closed_tracks_outgoing_close_routes() {
    let type_id = Uuid::new_v4();
    let open = stage(type_id, "Open", 5, false);
    let done = stage(type_id, "Done", 10, true);
    let wf = Workflow {
      request_type: rtype(type_id),
      routes:       vec![route(type_id, &open, &done)],
      stages:       vec![open.clone(), done.clone()],
    };
    assert!(wf.can_be_closed(open.stage_id));
    assert!(!wf.can_be_closed(done.stage_id));
  }
}
