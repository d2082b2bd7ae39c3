//! Integration tests for `SqliteStore` and the lifecycle engine against an
//! in-memory database.

use std::sync::{Arc, Mutex};

use deskflow_core::{
  Engine, Error,
  event::EventData,
  notify::{Notification, Notifier, NotifyError},
  party::Party,
  priority::{Impact, Priority, PriorityLevel, PriorityUpdate, Urgency},
  request::{KanbanState, NewRequest},
  retention::{RetentionPolicy, RetentionUnit},
  store::RequestStore,
  workflow::{NotificationToggles, RequestType, Route, Stage},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A [`Notifier`] that records everything it is asked to send.
#[derive(Clone, Default)]
struct RecordingNotifier {
  sent: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for RecordingNotifier {
  async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
    self.sent.lock().unwrap().push(notification);
    Ok(())
  }
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

struct Fixture {
  store:    SqliteStore,
  engine:   Engine<SqliteStore, RecordingNotifier>,
  sent:     Arc<Mutex<Vec<Notification>>>,
  type_id:  Uuid,
  new:      Uuid,
  progress: Uuid,
  done:     Uuid,
  author:   Uuid,
  agent:    Uuid,
}

fn rtype(type_id: Uuid, complex: bool) -> RequestType {
  RequestType {
    type_id,
    name: "Incident".into(),
    code: "incident".into(),
    active: true,
    complex_priority: complex,
    default_priority: PriorityLevel::Medium,
    default_impact: Impact::Medium,
    default_urgency: Urgency::Medium,
    default_request_text: Some("Please describe the problem.".into()),
    sequence_prefix: None,
    notify: NotificationToggles::default(),
  }
}

fn stage(type_id: Uuid, name: &str, sequence: u32, closed: bool) -> Stage {
  Stage {
    stage_id: Uuid::new_v4(),
    type_id,
    name: name.into(),
    code: name.to_lowercase().replace(' ', "_"),
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

/// One type with stages New(10) -> In Progress(20) -> Done(30, closed), a
/// reopen route Done -> In Progress, and two parties with email addresses.
async fn fixture_with(complex: bool) -> Fixture {
  let s = store().await;
  let notifier = RecordingNotifier::default();
  let sent = notifier.sent.clone();
  let engine = Engine::new(s.clone(), notifier);

  let type_id = Uuid::new_v4();
  s.insert_request_type(&rtype(type_id, complex)).await.unwrap();

  let new = stage(type_id, "New", 10, false);
  let progress = stage(type_id, "In Progress", 20, false);
  let done = stage(type_id, "Done", 30, true);
  for st in [&new, &progress, &done] {
    s.insert_stage(st).await.unwrap();
  }
  s.insert_route(&route(type_id, &new, &progress)).await.unwrap();
  s.insert_route(&route(type_id, &progress, &done)).await.unwrap();
  s.insert_route(&route(type_id, &done, &progress)).await.unwrap();

  let author = Uuid::new_v4();
  let agent = Uuid::new_v4();
  s.upsert_party(&Party {
    party_id: author,
    name:     "Alice".into(),
    email:    Some("alice@example.com".into()),
  })
  .await
  .unwrap();
  s.upsert_party(&Party {
    party_id: agent,
    name:     "Bob".into(),
    email:    Some("bob@example.com".into()),
  })
  .await
  .unwrap();

  Fixture {
    store: s,
    engine,
    sent,
    type_id,
    new: new.stage_id,
    progress: progress.stage_id,
    done: done.stage_id,
    author,
    agent,
  }
}

async fn fixture() -> Fixture { fixture_with(false).await }

// ─── Workflow configuration ──────────────────────────────────────────────────

#[tokio::test]
async fn request_type_roundtrips() {
  let s = store().await;
  let type_id = Uuid::new_v4();
  let mut t = rtype(type_id, true);
  t.sequence_prefix = Some("INC".into());
  t.notify.closed = false;
  s.insert_request_type(&t).await.unwrap();

  let fetched = s.get_request_type(type_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Incident");
  assert!(fetched.complex_priority);
  assert_eq!(fetched.sequence_prefix.as_deref(), Some("INC"));
  assert!(!fetched.notify.closed);
  assert!(fetched.notify.created);
  assert_eq!(fetched.default_priority, PriorityLevel::Medium);
}

#[tokio::test]
async fn duplicate_type_name_rejected() {
  let s = store().await;
  s.insert_request_type(&rtype(Uuid::new_v4(), false)).await.unwrap();
  let err = s
    .insert_request_type(&rtype(Uuid::new_v4(), false))
    .await
    .unwrap_err();
  assert!(matches!(
    deskflow_core::Error::from(err),
    Error::DuplicateName { .. }
  ));
}

#[tokio::test]
async fn workflow_missing_type_is_none() {
  let s = store().await;
  assert!(s.workflow(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn workflow_materializes_graph() {
  let f = fixture().await;
  let wf = f.store.workflow(f.type_id).await.unwrap().unwrap();
  assert_eq!(wf.stages.len(), 3);
  assert_eq!(wf.routes.len(), 3);
  assert_eq!(wf.start_stage().unwrap().stage_id, f.new);
  assert!(wf.can_be_closed(f.progress));
  assert!(!wf.can_be_closed(f.new));
}

#[tokio::test]
async fn delete_stage_rejected_while_routed() {
  let f = fixture().await;
  let err = f.store.delete_stage(f.done).await.unwrap_err();
  assert!(matches!(
    deskflow_core::Error::from(err),
    Error::StageHasRoutes { .. }
  ));

  // A stage no route touches can go.
  let lonely = stage(f.type_id, "Parked", 99, false);
  f.store.insert_stage(&lonely).await.unwrap();
  f.store.delete_stage(lonely.stage_id).await.unwrap();
  let wf = f.store.workflow(f.type_id).await.unwrap().unwrap();
  assert_eq!(wf.stages.len(), 3);
}

#[tokio::test]
async fn upsert_party_overwrites() {
  let s = store().await;
  let party_id = Uuid::new_v4();
  s.upsert_party(&Party {
    party_id,
    name: "Carol".into(),
    email: None,
  })
  .await
  .unwrap();
  s.upsert_party(&Party {
    party_id,
    name: "Carol".into(),
    email: Some("carol@example.com".into()),
  })
  .await
  .unwrap();
  let fetched = s.get_party(party_id).await.unwrap().unwrap();
  assert_eq!(fetched.email.as_deref(), Some("carol@example.com"));
}

// ─── Name sequences ──────────────────────────────────────────────────────────

#[tokio::test]
async fn next_name_increments_per_prefix() {
  let s = store().await;
  assert_eq!(s.next_name("REQ").await.unwrap(), "REQ-00001");
  assert_eq!(s.next_name("REQ").await.unwrap(), "REQ-00002");
  assert_eq!(s.next_name("INC").await.unwrap(), "INC-00001");
}

#[tokio::test]
async fn concurrent_creations_get_distinct_names() {
  let f = fixture().await;
  let (a, b) = tokio::join!(
    f.engine
      .create_request(NewRequest::new(f.type_id, f.author), f.author),
    f.engine
      .create_request(NewRequest::new(f.type_id, f.author), f.author),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_ne!(a.name, b.name);
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_starts_at_lowest_sequence_stage() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  assert_eq!(req.stage_id, f.new);
  assert_eq!(req.name, "REQ-00001");
  assert_eq!(req.version, 0);
  assert_eq!(req.request_text, "Please describe the problem.");
  assert_eq!(req.effective_priority(), PriorityLevel::Medium);
  assert!(req.date_closed.is_none());
  assert!(req.date_assigned.is_none());

  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].code(), "created");
}

#[tokio::test]
async fn create_without_stages_is_rejected() {
  let s = store().await;
  let engine = Engine::new(s.clone(), RecordingNotifier::default());
  let type_id = Uuid::new_v4();
  s.insert_request_type(&rtype(type_id, false)).await.unwrap();

  let err = engine
    .create_request(NewRequest::new(type_id, Uuid::new_v4()), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NoStartStage { .. }));
}

#[tokio::test]
async fn duplicate_explicit_name_rejected() {
  let f = fixture().await;
  let mut input = NewRequest::new(f.type_id, f.author);
  input.name = Some("TICKET-1".into());
  f.engine.create_request(input.clone(), f.author).await.unwrap();
  let err = f.engine.create_request(input, f.author).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateName { .. }));

  let by_name = f
    .store
    .get_request_by_name("TICKET-1")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_name.name, "TICKET-1");
  assert!(f.store.get_request_by_name("TICKET-2").await.unwrap().is_none());
}

#[tokio::test]
async fn create_notifies_author() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let sent = f.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].recipient.party_id, f.author);
  assert_eq!(sent[0].event_code, "created");
  assert!(sent[0].subject.contains(&req.name));
}

#[tokio::test]
async fn recipient_without_email_is_skipped() {
  let f = fixture().await;
  let silent = Uuid::new_v4();
  f.store
    .upsert_party(&Party {
      party_id: silent,
      name:     "Mallory".into(),
      email:    None,
    })
    .await
    .unwrap();

  f.engine
    .create_request(NewRequest::new(f.type_id, silent), silent)
    .await
    .unwrap();
  assert!(f.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn notification_toggles_gate_dispatch() {
  let s = store().await;
  let notifier = RecordingNotifier::default();
  let sent = notifier.sent.clone();
  let engine = Engine::new(s.clone(), notifier);

  let type_id = Uuid::new_v4();
  let mut t = rtype(type_id, false);
  t.notify.created = false;
  s.insert_request_type(&t).await.unwrap();
  s.insert_stage(&stage(type_id, "New", 10, false)).await.unwrap();

  let author = Uuid::new_v4();
  s.upsert_party(&Party {
    party_id: author,
    name:     "Alice".into(),
    email:    Some("alice@example.com".into()),
  })
  .await
  .unwrap();

  engine
    .create_request(NewRequest::new(type_id, author), author)
    .await
    .unwrap();
  assert!(sent.lock().unwrap().is_empty());
}

// ─── Stage transitions ───────────────────────────────────────────────────────

#[tokio::test]
async fn set_stage_follows_routes() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let moved = f
    .engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();
  assert_eq!(moved.stage_id, f.progress);
  assert_eq!(moved.moved_by, Some(f.agent));
  assert!(moved.date_moved.is_some());
  assert!(moved.last_route_id.is_some());
  assert_eq!(moved.version, 1);

  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events[0].code(), "stage-changed");
}

#[tokio::test]
async fn set_stage_rejects_unrouted_transition() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  // There is no direct New -> Done route.
  let err = f
    .engine
    .set_stage(req.request_id, f.done, f.agent)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidTransition { .. }));

  // The failed transition left no trace.
  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events.len(), 1);
  let reloaded = f.store.get_request(req.request_id).await.unwrap().unwrap();
  assert_eq!(reloaded.stage_id, f.new);
}

#[tokio::test]
async fn close_and_reopen_track_date_closed() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();

  let closed = f
    .engine
    .set_stage(req.request_id, f.done, f.agent)
    .await
    .unwrap();
  assert!(closed.date_closed.is_some());
  assert_eq!(closed.closed_by, Some(f.agent));

  let reopened = f
    .engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();
  assert!(reopened.date_closed.is_none());
  assert!(reopened.closed_by.is_none());

  let codes: Vec<&str> = f
    .engine
    .events_for_request(req.request_id)
    .await
    .unwrap()
    .iter()
    .map(|e| e.code())
    .collect();
  // newest first
  assert_eq!(codes, vec!["reopened", "closed", "stage-changed", "created"]);
}

#[tokio::test]
async fn close_and_reopen_notify_author() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.done, f.agent)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();

  let sent = f.sent.lock().unwrap();
  let codes: Vec<&str> = sent.iter().map(|n| n.event_code).collect();
  assert_eq!(codes, vec!["created", "closed", "reopened"]);
  assert!(sent.iter().all(|n| n.recipient.party_id == f.author));
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn assign_reassign_unassign() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let assigned = f
    .engine
    .set_assignee(req.request_id, Some(f.agent), None, f.author)
    .await
    .unwrap();
  assert_eq!(assigned.user_id, Some(f.agent));
  assert!(assigned.date_assigned.is_some());

  let other = Uuid::new_v4();
  f.store
    .upsert_party(&Party {
      party_id: other,
      name:     "Dave".into(),
      email:    Some("dave@example.com".into()),
    })
    .await
    .unwrap();
  f.engine
    .set_assignee(req.request_id, Some(other), Some("handover".into()), f.agent)
    .await
    .unwrap();

  let unassigned = f
    .engine
    .set_assignee(req.request_id, None, None, f.agent)
    .await
    .unwrap();
  assert!(unassigned.user_id.is_none());
  assert!(unassigned.date_assigned.is_none());

  let codes: Vec<&str> = f
    .engine
    .events_for_request(req.request_id)
    .await
    .unwrap()
    .iter()
    .map(|e| e.code())
    .collect();
  assert_eq!(codes, vec!["unassigned", "reassigned", "assigned", "created"]);

  // assignment notifications went to the incoming assignee
  let sent = f.sent.lock().unwrap();
  let assign_targets: Vec<Uuid> = sent
    .iter()
    .filter(|n| n.event_code == "assigned" || n.event_code == "reassigned")
    .map(|n| n.recipient.party_id)
    .collect();
  assert_eq!(assign_targets, vec![f.agent, other]);
}

#[tokio::test]
async fn assign_unchanged_is_a_noop() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  f.engine
    .set_assignee(req.request_id, Some(f.agent), None, f.author)
    .await
    .unwrap();
  let again = f
    .engine
    .set_assignee(req.request_id, Some(f.agent), None, f.author)
    .await
    .unwrap();
  // version unchanged, no extra event
  assert_eq!(again.version, 1);
  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn assign_on_closed_request_rejected() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.progress, f.agent)
    .await
    .unwrap();
  f.engine
    .set_stage(req.request_id, f.done, f.agent)
    .await
    .unwrap();

  let err = f
    .engine
    .set_assignee(req.request_id, Some(f.agent), None, f.agent)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::RequestClosed { .. }));
}

// ─── Tracked field changes ───────────────────────────────────────────────────

#[tokio::test]
async fn text_change_records_old_and_new() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  f.engine
    .set_text(req.request_id, "The printer is on fire.".into(), f.author)
    .await
    .unwrap();

  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events[0].code(), "changed");
  match &events[0].data {
    EventData::Changed { old_text, new_text } => {
      assert_eq!(old_text, "Please describe the problem.");
      assert_eq!(new_text, "The printer is on fire.");
    }
    other => panic!("unexpected event data: {other:?}"),
  }

  // setting the same text again emits nothing
  f.engine
    .set_text(req.request_id, "The printer is on fire.".into(), f.author)
    .await
    .unwrap();
  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn kanban_and_deadline_changes_are_tracked() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  f.engine
    .set_kanban_state(req.request_id, KanbanState::Blocked, f.agent)
    .await
    .unwrap();
  let deadline = chrono::NaiveDate::from_ymd_opt(2026, 9, 15).unwrap();
  let updated = f
    .engine
    .set_deadline(req.request_id, Some(deadline), f.agent)
    .await
    .unwrap();
  assert_eq!(updated.deadline_date, Some(deadline));
  assert_eq!(updated.kanban_state, KanbanState::Blocked);

  let codes: Vec<&str> = f
    .engine
    .events_for_request(req.request_id)
    .await
    .unwrap()
    .iter()
    .map(|e| e.code())
    .collect();
  assert_eq!(
    codes,
    vec!["deadline-changed", "kanban-state-changed", "created"]
  );
}

// ─── Priority ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn simple_priority_direct_write() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let updated = f
    .engine
    .set_priority_fields(
      req.request_id,
      PriorityUpdate {
        priority: Some(PriorityLevel::Critical),
        // ignored for a simple-priority type
        impact: Some(Impact::Low),
        urgency: None,
      },
      f.agent,
    )
    .await
    .unwrap();

  assert_eq!(updated.effective_priority(), PriorityLevel::Critical);
  assert!(!updated.priority.is_derived());
  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events[0].code(), "priority-changed");
  assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn complex_priority_derives_from_impact_and_urgency() {
  let f = fixture_with(true).await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  // type defaults: impact Medium, urgency Medium -> Medium
  assert_eq!(req.effective_priority(), PriorityLevel::Medium);
  assert!(req.priority.is_derived());

  let updated = f
    .engine
    .set_priority_fields(
      req.request_id,
      PriorityUpdate {
        priority: None,
        impact:   Some(Impact::High),
        urgency:  Some(Urgency::High),
      },
      f.agent,
    )
    .await
    .unwrap();
  assert_eq!(updated.effective_priority(), PriorityLevel::Critical);

  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  let codes: Vec<&str> = events.iter().map(|e| e.code()).collect();
  // one raw event plus one synthetic priority-changed per changed field
  assert_eq!(codes.iter().filter(|c| **c == "priority-changed").count(), 2);
  assert!(codes.contains(&"impact-changed"));
  assert!(codes.contains(&"urgency-changed"));
  assert_eq!(events.len(), 5);

  // synthetic deltas are computed against the post-write counterpart:
  // derived(Medium, High) = High -> derived(High, High) = Critical
  for event in &events {
    if let EventData::PriorityChanged { old_priority, new_priority } =
      &event.data
    {
      assert_eq!(*old_priority, PriorityLevel::High);
      assert_eq!(*new_priority, PriorityLevel::Critical);
    }
  }
}

#[tokio::test]
async fn direct_write_on_derived_priority_is_ignored() {
  let f = fixture_with(true).await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let updated = f
    .engine
    .set_priority_fields(
      req.request_id,
      PriorityUpdate {
        priority: Some(PriorityLevel::Critical),
        impact:   None,
        urgency:  None,
      },
      f.agent,
    )
    .await
    .unwrap();

  assert_eq!(
    updated.priority,
    Priority::Derived { impact: Impact::Medium, urgency: Urgency::Medium }
  );
  let events = f.engine.events_for_request(req.request_id).await.unwrap();
  assert_eq!(events.len(), 1);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn stale_version_write_conflicts() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  // Two writers load version 0; the second commit must lose.
  let mut first = req.clone();
  first.version = 1;
  f.store.update_request(&first, 0, &[]).await.unwrap();

  let mut second = req.clone();
  second.version = 1;
  let err = f.store.update_request(&second, 0, &[]).await.unwrap_err();
  assert!(matches!(
    deskflow_core::Error::from(err),
    Error::Conflict { .. }
  ));
}

#[tokio::test]
async fn type_change_is_rejected() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let mut mutated = req.clone();
  mutated.type_id = Uuid::new_v4();
  mutated.version = 1;
  let err = f.store.update_request(&mutated, 0, &[]).await.unwrap_err();
  assert!(matches!(
    deskflow_core::Error::from(err),
    Error::ImmutableType { .. }
  ));
}

// ─── Event retention ─────────────────────────────────────────────────────────

#[tokio::test]
async fn vacuum_respects_auto_remove() {
  let f = fixture().await;
  f.engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let disabled = RetentionPolicy {
    auto_remove: false,
    value:       0,
    unit:        RetentionUnit::Days,
  };
  assert_eq!(f.engine.vacuum_events(&disabled, None).await.unwrap(), 0);
  assert_eq!(f.engine.vacuum_events(&disabled, Some(0)).await.unwrap(), 0);
}

#[tokio::test]
async fn vacuum_deletes_only_expired_events() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  // Fresh events survive the default 90-day policy.
  let policy = RetentionPolicy::default();
  assert_eq!(f.engine.vacuum_events(&policy, None).await.unwrap(), 0);
  assert_eq!(
    f.engine.events_for_request(req.request_id).await.unwrap().len(),
    1
  );

  // A zero-day override expires everything; a second sweep is a no-op.
  assert_eq!(f.engine.vacuum_events(&policy, Some(0)).await.unwrap(), 1);
  assert_eq!(f.engine.vacuum_events(&policy, Some(0)).await.unwrap(), 0);
  assert!(
    f.engine.events_for_request(req.request_id).await.unwrap().is_empty()
  );
}

// ─── Time tracking ───────────────────────────────────────────────────────────

#[tokio::test]
async fn start_and_stop_work() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();

  let line = f.engine.start_work(req.request_id, f.agent).await.unwrap();
  assert!(line.is_running());

  // one running line per user
  let err = f.engine.start_work(req.request_id, f.agent).await.unwrap_err();
  assert!(matches!(err, Error::WorkAlreadyStarted(_)));

  let stopped = f.engine.stop_work(req.request_id, f.agent).await.unwrap();
  assert_eq!(stopped.line_id, line.line_id);
  assert!(!stopped.is_running());
  assert!(stopped.amount >= 0.0);

  let lines = f
    .store
    .timesheet_lines_for_request(req.request_id)
    .await
    .unwrap();
  assert_eq!(lines.len(), 1);

  let codes: Vec<&str> = f
    .engine
    .events_for_request(req.request_id)
    .await
    .unwrap()
    .iter()
    .map(|e| e.code())
    .collect();
  assert_eq!(
    codes,
    vec!["timetracking-stop-work", "timetracking-start-work", "created"]
  );
}

#[tokio::test]
async fn stop_without_running_line_rejected() {
  let f = fixture().await;
  let req = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  let err = f
    .engine
    .stop_work(req.request_id, f.agent)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NoRunningWork(_)));

  // a line running on another request does not satisfy this one
  let other = f
    .engine
    .create_request(NewRequest::new(f.type_id, f.author), f.author)
    .await
    .unwrap();
  f.engine.start_work(other.request_id, f.agent).await.unwrap();
  let err = f
    .engine
    .stop_work(req.request_id, f.agent)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NoRunningWork(_)));
}
