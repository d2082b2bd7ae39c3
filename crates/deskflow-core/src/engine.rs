//! The request lifecycle engine.
//!
//! Every mutating operation runs the same pipeline:
//!
//! ```text
//! validate -> compute side effects -> apply write + append events -> notify
//! ```
//!
//! The write and its events are one store transaction; validation failures
//! abort with no partial state and no events. Notification dispatch happens
//! after the commit, is best-effort, and is fault-isolated per recipient.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{Event, EventData},
  notify::{Notification, Notifier},
  priority::{Priority, PriorityUpdate, derived_level},
  request::{KanbanState, NewRequest, Request},
  retention::RetentionPolicy,
  store::RequestStore,
  timesheet::TimesheetLine,
  workflow::{RequestType, Workflow},
};

/// Prefix of the global name sequence, used by types without their own.
const DEFAULT_SEQUENCE_PREFIX: &str = "REQ";

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The lifecycle engine over a storage backend and a notification sender.
///
/// Cloning is as cheap as cloning the two components; callers typically wrap
/// the engine in an `Arc` and share it.
#[derive(Clone)]
pub struct Engine<S, N> {
  store:    S,
  notifier: N,
}

impl<S, N> Engine<S, N>
where
  S: RequestStore,
  N: Notifier,
{
  pub fn new(store: S, notifier: N) -> Self { Self { store, notifier } }

  /// Direct access to the backing store, for read paths that bypass the
  /// lifecycle (listing, admin configuration).
  pub fn store(&self) -> &S { &self.store }

  // ── Loading helpers ───────────────────────────────────────────────────

  async fn load_request(&self, request_id: Uuid) -> Result<Request> {
    self
      .store
      .get_request(request_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::RequestNotFound(request_id))
  }

  async fn load_workflow(&self, type_id: Uuid) -> Result<Workflow> {
    self
      .store
      .workflow(type_id)
      .await
      .map_err(Into::into)?
      .ok_or(Error::TypeNotFound(type_id))
  }

  fn event(
    &self,
    request: &Request,
    data: EventData,
    actor: Uuid,
    at: DateTime<Utc>,
  ) -> Event {
    Event {
      event_id: Uuid::new_v4(),
      request_id: request.request_id,
      data,
      date: at,
      user_id: actor,
    }
  }

  /// Bump the version, persist the request plus its events transactionally,
  /// then fan out notifications.
  async fn commit(
    &self,
    request: &mut Request,
    events: Vec<Event>,
    rtype: &RequestType,
  ) -> Result<()> {
    let expected = request.version;
    request.version += 1;
    self
      .store
      .update_request(request, expected, &events)
      .await
      .map_err(Into::into)?;
    self.dispatch_events(request, rtype, &events).await;
    Ok(())
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Create a request: resolve the type, assign a unique name and the start
  /// stage, fill defaults, and emit the `created` event.
  pub async fn create_request(
    &self,
    input: NewRequest,
    actor: Uuid,
  ) -> Result<Request> {
    let workflow = self.load_workflow(input.type_id).await?;
    let rtype = &workflow.request_type;

    let start_stage =
      workflow.start_stage().ok_or_else(|| Error::NoStartStage {
        type_name: rtype.name.clone(),
      })?;

    let name = match input.name {
      Some(name) => name,
      None => {
        let prefix = rtype
          .sequence_prefix
          .as_deref()
          .unwrap_or(DEFAULT_SEQUENCE_PREFIX);
        self.store.next_name(prefix).await.map_err(Into::into)?
      }
    };

    let priority = if rtype.complex_priority {
      Priority::Derived {
        impact:  input.impact.unwrap_or(rtype.default_impact),
        urgency: input.urgency.unwrap_or(rtype.default_urgency),
      }
    } else {
      Priority::Direct {
        level: input.priority.unwrap_or(rtype.default_priority),
      }
    };

    let request_text = input
      .request_text
      .or_else(|| rtype.default_request_text.clone())
      .unwrap_or_default();

    let now = Utc::now();
    let request = Request {
      request_id: Uuid::new_v4(),
      name,
      type_id: rtype.type_id,
      stage_id: start_stage.stage_id,
      category_id: input.category_id,
      priority,
      kanban_state: KanbanState::default(),
      user_id: input.user_id,
      author_id: input.author_id,
      partner_id: input.partner_id,
      request_text,
      response_text: None,
      deadline_date: input.deadline_date,
      date_created: now,
      date_assigned: input.user_id.map(|_| now),
      date_moved: None,
      date_closed: None,
      created_by: actor,
      moved_by: None,
      closed_by: None,
      last_route_id: None,
      version: 0,
    };

    let event = self.event(&request, EventData::Created, actor, now);
    self
      .store
      .insert_request(&request, &event)
      .await
      .map_err(Into::into)?;

    tracing::info!(request = %request.name, "request created");
    self.dispatch_events(&request, rtype, std::slice::from_ref(&event)).await;
    Ok(request)
  }

  // ── Stage transitions ─────────────────────────────────────────────────

  /// Move a request along a configured route. Emits exactly one of
  /// `closed`, `reopened`, or `stage-changed`.
  pub async fn set_stage(
    &self,
    request_id: Uuid,
    target_stage_id: Uuid,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    let workflow = self.load_workflow(request.type_id).await?;

    let route = workflow
      .ensure_route(&request.name, request.stage_id, target_stage_id)?
      .clone();
    let old_stage = workflow.stage(request.stage_id)?.clone();
    let new_stage = workflow.stage(target_stage_id)?.clone();

    let now = Utc::now();
    request.last_route_id = Some(route.route_id);
    request.date_moved = Some(now);
    request.moved_by = Some(actor);

    if !old_stage.closed && new_stage.closed {
      request.date_closed = Some(now);
      request.closed_by = Some(actor);
    } else if old_stage.closed && !new_stage.closed {
      request.date_closed = None;
      request.closed_by = None;
    }
    request.stage_id = new_stage.stage_id;

    let data = if new_stage.closed && !old_stage.closed {
      EventData::Closed {
        route:     route.route_id,
        old_stage: old_stage.stage_id,
        new_stage: new_stage.stage_id,
      }
    } else if old_stage.closed && !new_stage.closed {
      EventData::Reopened {
        route:     route.route_id,
        old_stage: old_stage.stage_id,
        new_stage: new_stage.stage_id,
      }
    } else {
      EventData::StageChanged {
        route:     route.route_id,
        old_stage: old_stage.stage_id,
        new_stage: new_stage.stage_id,
      }
    };

    let event = self.event(&request, data, actor, now);
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  // ── Assignment ────────────────────────────────────────────────────────

  /// Assign, reassign, or unassign (`user = None`) a request. Rejected on
  /// closed requests. A no-change call emits nothing.
  pub async fn set_assignee(
    &self,
    request_id: Uuid,
    user: Option<Uuid>,
    comment: Option<String>,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    let workflow = self.load_workflow(request.type_id).await?;

    if workflow.stage(request.stage_id)?.closed {
      return Err(Error::RequestClosed { request: request.name });
    }
    if request.user_id == user {
      return Ok(request);
    }

    let now = Utc::now();
    let old_user = request.user_id;
    request.user_id = user;
    request.date_assigned = user.map(|_| now);

    let data = match (old_user, user) {
      (None, Some(new_user)) => EventData::Assigned { new_user, comment },
      (Some(old_user), Some(new_user)) => {
        EventData::Reassigned { old_user, new_user, comment }
      }
      (Some(old_user), None) => EventData::Unassigned { old_user },
      // equal values returned early above
      (None, None) => return Ok(request),
    };

    let event = self.event(&request, data, actor, now);
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  // ── Tracked field changes ─────────────────────────────────────────────

  /// Replace the request text, emitting `changed` with the old and new
  /// values.
  pub async fn set_text(
    &self,
    request_id: Uuid,
    text: String,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    if request.request_text == text {
      return Ok(request);
    }
    let workflow = self.load_workflow(request.type_id).await?;

    let old_text = std::mem::replace(&mut request.request_text, text.clone());
    let event = self.event(
      &request,
      EventData::Changed { old_text, new_text: text },
      actor,
      Utc::now(),
    );
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  pub async fn set_category(
    &self,
    request_id: Uuid,
    category_id: Option<Uuid>,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    if request.category_id == category_id {
      return Ok(request);
    }
    let workflow = self.load_workflow(request.type_id).await?;

    let old_category = request.category_id;
    request.category_id = category_id;
    let event = self.event(
      &request,
      EventData::CategoryChanged { old_category, new_category: category_id },
      actor,
      Utc::now(),
    );
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  pub async fn set_deadline(
    &self,
    request_id: Uuid,
    deadline: Option<NaiveDate>,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    if request.deadline_date == deadline {
      return Ok(request);
    }
    let workflow = self.load_workflow(request.type_id).await?;

    let old_deadline = request.deadline_date;
    request.deadline_date = deadline;
    let event = self.event(
      &request,
      EventData::DeadlineChanged { old_deadline, new_deadline: deadline },
      actor,
      Utc::now(),
    );
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  pub async fn set_kanban_state(
    &self,
    request_id: Uuid,
    state: KanbanState,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    if request.kanban_state == state {
      return Ok(request);
    }
    let workflow = self.load_workflow(request.type_id).await?;

    let old_state = request.kanban_state;
    request.kanban_state = state;
    let event = self.event(
      &request,
      EventData::KanbanStateChanged { old_state, new_state: state },
      actor,
      Utc::now(),
    );
    self
      .commit(&mut request, vec![event], &workflow.request_type)
      .await?;
    Ok(request)
  }

  // ── Priority ──────────────────────────────────────────────────────────

  /// Apply a partial priority update.
  ///
  /// For simple-priority requests only `priority` is meaningful; a nonzero
  /// delta emits `priority-changed`. For complex-priority requests the
  /// direct `priority` field is a no-op, and each changed raw field emits
  /// its own event plus a synthetic `priority-changed` computed against the
  /// post-write value of the unchanged counterpart — so changing both
  /// impact and urgency in one call emits four events.
  pub async fn set_priority_fields(
    &self,
    request_id: Uuid,
    update: PriorityUpdate,
    actor: Uuid,
  ) -> Result<Request> {
    let mut request = self.load_request(request_id).await?;
    let workflow = self.load_workflow(request.type_id).await?;

    let now = Utc::now();
    let mut events = Vec::new();

    match request.priority {
      Priority::Direct { level: old_level } => {
        if update.impact.is_some() || update.urgency.is_some() {
          tracing::debug!(
            request = %request.name,
            "impact/urgency ignored for simple-priority request"
          );
        }
        let new_level = update.priority.unwrap_or(old_level);
        if new_level != old_level {
          request.priority = Priority::Direct { level: new_level };
          events.push(self.event(
            &request,
            EventData::PriorityChanged {
              old_priority: old_level,
              new_priority: new_level,
            },
            actor,
            now,
          ));
        }
      }

      Priority::Derived { impact: old_impact, urgency: old_urgency } => {
        if update.priority.is_some() {
          tracing::debug!(
            request = %request.name,
            "direct priority write ignored for complex-priority request"
          );
        }
        let new_impact = update.impact.unwrap_or(old_impact);
        let new_urgency = update.urgency.unwrap_or(old_urgency);
        request.priority =
          Priority::Derived { impact: new_impact, urgency: new_urgency };

        if new_impact != old_impact {
          events.push(self.event(
            &request,
            EventData::PriorityChanged {
              old_priority: derived_level(old_impact, new_urgency),
              new_priority: derived_level(new_impact, new_urgency),
            },
            actor,
            now,
          ));
          events.push(self.event(
            &request,
            EventData::ImpactChanged { old_impact, new_impact },
            actor,
            now,
          ));
        }
        if new_urgency != old_urgency {
          events.push(self.event(
            &request,
            EventData::PriorityChanged {
              old_priority: derived_level(new_impact, old_urgency),
              new_priority: derived_level(new_impact, new_urgency),
            },
            actor,
            now,
          ));
          events.push(self.event(
            &request,
            EventData::UrgencyChanged { old_urgency, new_urgency },
            actor,
            now,
          ));
        }
      }
    }

    if events.is_empty() {
      return Ok(request);
    }
    self
      .commit(&mut request, events, &workflow.request_type)
      .await?;
    Ok(request)
  }

  // ── Time tracking ─────────────────────────────────────────────────────

  /// Open a timesheet line for `actor` on a request. A user can only have
  /// one running line at a time.
  pub async fn start_work(
    &self,
    request_id: Uuid,
    actor: Uuid,
  ) -> Result<TimesheetLine> {
    let request = self.load_request(request_id).await?;

    if let Some(running) = self
      .store
      .running_line_for_user(actor)
      .await
      .map_err(Into::into)?
    {
      tracing::debug!(line = %running.line_id, "work already started");
      return Err(Error::WorkAlreadyStarted(actor));
    }

    let now = Utc::now();
    let line = TimesheetLine {
      line_id: Uuid::new_v4(),
      request_id: request.request_id,
      user_id: actor,
      date_start: now,
      date_end: None,
      amount: 0.0,
    };
    let event = self.event(
      &request,
      EventData::TimetrackingStartWork { line: line.line_id },
      actor,
      now,
    );
    self
      .store
      .insert_timesheet_line(&line, &event)
      .await
      .map_err(Into::into)?;
    Ok(line)
  }

  /// Stop `actor`'s running timesheet line on a request, computing the
  /// spent hours. A running line on a different request does not count.
  pub async fn stop_work(
    &self,
    request_id: Uuid,
    actor: Uuid,
  ) -> Result<TimesheetLine> {
    let request = self.load_request(request_id).await?;
    let mut line = self
      .store
      .running_line_for_user(actor)
      .await
      .map_err(Into::into)?
      .filter(|line| line.request_id == request.request_id)
      .ok_or(Error::NoRunningWork(actor))?;

    let now = Utc::now();
    line.date_end = Some(now);
    line.amount = (now - line.date_start)
      .max(Duration::zero())
      .num_seconds() as f64
      / 3600.0;

    let event = self.event(
      &request,
      EventData::TimetrackingStopWork {
        line:         line.line_id,
        amount_hours: line.amount,
      },
      actor,
      now,
    );
    self
      .store
      .close_timesheet_line(&line, &event)
      .await
      .map_err(Into::into)?;
    Ok(line)
  }

  // ── Event log ─────────────────────────────────────────────────────────

  pub async fn events_for_request(&self, request_id: Uuid) -> Result<Vec<Event>> {
    self
      .store
      .events_for_request(request_id)
      .await
      .map_err(Into::into)
  }

  /// The retention sweep. No-op when `policy.auto_remove` is off; the
  /// `days` argument overrides the policy's period and exists only for
  /// backwards compatibility with older cron configurations.
  pub async fn vacuum_events(
    &self,
    policy: &RetentionPolicy,
    days: Option<u32>,
  ) -> Result<usize> {
    if !policy.auto_remove {
      return Ok(0);
    }
    let now = Utc::now();
    let cutoff = match days {
      Some(days) => {
        tracing::warn!(
          days,
          "explicit vacuum period is deprecated; configure the retention \
           policy instead"
        );
        now - Duration::days(i64::from(days))
      }
      None => policy.cutoff(now),
    };
    let deleted = self
      .store
      .vacuum_events(cutoff)
      .await
      .map_err(Into::into)?;
    tracing::info!(deleted, %cutoff, "event vacuum complete");
    Ok(deleted)
  }

  // ── Notification dispatch ─────────────────────────────────────────────

  /// Route events to the default notifications the owning type enables.
  /// Failures are logged and never propagated; one bad recipient does not
  /// block the others.
  async fn dispatch_events(
    &self,
    request: &Request,
    rtype: &RequestType,
    events: &[Event],
  ) {
    for event in events {
      match &event.data {
        EventData::Created if rtype.notify.created => {
          self
            .notify_party(
              request.author_id,
              format!("Request {} successfully created!", request.name),
              request,
              event,
            )
            .await;
        }
        EventData::Closed { .. } if rtype.notify.closed => {
          self
            .notify_party(
              request.author_id,
              format!("Your request {} has been closed!", request.name),
              request,
              event,
            )
            .await;
        }
        EventData::Reopened { .. } if rtype.notify.reopened => {
          self
            .notify_party(
              request.author_id,
              format!("Your request {} has been reopened!", request.name),
              request,
              event,
            )
            .await;
        }
        EventData::Assigned { new_user, .. }
        | EventData::Reassigned { new_user, .. }
          if rtype.notify.assigned =>
        {
          self
            .notify_party(
              *new_user,
              format!("You have been assigned to request {}!", request.name),
              request,
              event,
            )
            .await;
        }
        _ => {}
      }
    }
  }

  async fn notify_party(
    &self,
    party_id: Uuid,
    subject: String,
    request: &Request,
    event: &Event,
  ) {
    let party = match self.store.get_party(party_id).await {
      Ok(Some(party)) => party,
      Ok(None) => {
        tracing::warn!(%party_id, "notification recipient not found");
        return;
      }
      Err(e) => {
        tracing::warn!(%party_id, error = %e, "failed to load recipient");
        return;
      }
    };

    // Recipients without an email are silently skipped.
    if party.email.is_none() {
      return;
    }

    let notification = Notification {
      recipient: party,
      body: format!("{subject}\n\n{}", request.request_text),
      subject,
      event_code: event.code(),
      request_name: request.name.clone(),
    };
    if let Err(e) = self.notifier.send(notification).await {
      tracing::warn!(
        request = %request.name,
        event = event.code(),
        error = %e,
        "notification delivery failed"
      );
    }
  }
}
