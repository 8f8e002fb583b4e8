//! SessionWorker Actor - one isolated worker per active session
//!
//! The worker is the unit of serialization: every action for its session,
//! external or timer-fired, funnels through this single actor's mailbox and
//! is applied synchronously to the pure session machine, so the effective
//! action order is exactly the delivery order. The worker owns the
//! scheduler, publishes correlated results on the session's broadcast
//! channel, and coalesces snapshot writes - a transition marks the state
//! dirty and schedules one deferred flush; transitions landing inside the
//! flush window share a single write of the latest snapshot.

use std::sync::Arc;

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    actor::{
        message::{
            ActionOutcome, SessionEvent, SessionEventKind, SessionSupervisorMessage, SessionWorkerMessage
        },
        scheduler::SessionScheduler
    },
    config::AppContext,
    domain::{
        action::Action,
        compiler::compile,
        constant::{scheduler as scheduler_events, worker},
        error::SessionError,
        machine::SessionMachine,
        state::Snapshot
    },
    port::store::SnapshotStore
};

/// SessionWorker Actor State
pub struct SessionWorkerState {
    /// Session id (this IS the snapshot key in the store)
    pub session_id: String,
    /// The compiled machine - pure transition logic
    pub machine:    SessionMachine,
    /// Current snapshot, mutated only through the machine
    pub snapshot:   Snapshot,
    /// Deadline timers for the current position
    pub scheduler:  SessionScheduler,
    /// Snapshot persistence port
    pub snapshots:  Arc<dyn SnapshotStore>,
    /// Outbound broadcast channel for this session
    pub events:     broadcast::Sender<SessionEvent>,
    /// Parent supervisor, notified when the terminal stage is reached
    pub supervisor: ActorRef<SessionSupervisorMessage>,
    flush_delay:    std::time::Duration,
    flush_pending:  bool,
    dirty:          bool
}

impl SessionWorkerState {
    /// Schedule one deferred flush; later transitions in the same window
    /// coalesce into it.
    fn mark_dirty(&mut self, myself: &ActorRef<SessionWorkerMessage>) {
        self.dirty = true;
        if !self.flush_pending {
            self.flush_pending = true;
            event!(Level::DEBUG, event = worker::FLUSH_SCHEDULED, session_id = %self.session_id);
            let _ = myself.send_after(self.flush_delay, || SessionWorkerMessage::FlushSnapshot);
        }
    }

    async fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        match self.snapshots.save(&self.session_id, &self.snapshot).await {
            Ok(()) => {
                self.dirty = false;
                event!(Level::DEBUG, event = worker::SNAPSHOT_FLUSHED, session_id = %self.session_id);
            }
            Err(e) => {
                event!(Level::ERROR, event = worker::SNAPSHOT_FLUSH_FAILED,
                       session_id = %self.session_id, error = %e);
                self.publish(SessionEventKind::Failed, None, Some(e.to_string()));
            }
        }
    }

    /// Publish on the session's outbound channel. No receiver is not an
    /// error; the snapshot store remains the source of truth.
    fn publish(&self, kind: SessionEventKind, correlation_id: Option<Uuid>, error: Option<String>) {
        let _ = self.events.send(SessionEvent {
            session_id: self.session_id.clone(),
            kind,
            correlation_id,
            snapshot: Some(self.snapshot.clone()),
            error
        });
    }
}

/// SessionWorker Actor - hosts one session's machine and scheduler
pub struct SessionWorker;

#[async_trait::async_trait]
impl Actor for SessionWorker {
    type Arguments = (String, AppContext, ActorRef<SessionSupervisorMessage>, broadcast::Sender<SessionEvent>);
    type Msg = SessionWorkerMessage;
    type State = SessionWorkerState;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (session_id, app_context, supervisor, events): Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        // a missing definition is fatal: the worker never signals started
        let definition = app_context
            .repository
            .resolve(&session_id)
            .await?
            .ok_or_else(|| SessionError::Definition(format!("no workshop definition for session '{}'", session_id)))?;

        let machine = SessionMachine::new(compile(&definition));

        let snapshot = match app_context.snapshots.load(&session_id).await? {
            Some(stored) => {
                event!(Level::DEBUG, event = worker::SNAPSHOT_RESTORED,
                       session_id = %session_id, value = ?stored.value);
                stored
            }
            None => {
                event!(Level::DEBUG, event = worker::SNAPSHOT_FRESH, session_id = %session_id);
                machine.initial(definition.required_profiles, Utc::now())
            }
        };

        let mut scheduler = SessionScheduler::new(&myself, machine.definition());
        // a restored snapshot may resume mid-activity; re-arm its timers
        scheduler.observe(&myself, machine.definition(), &snapshot);

        let state = SessionWorkerState {
            session_id: session_id.clone(),
            machine,
            snapshot,
            scheduler,
            snapshots: app_context.snapshots.clone(),
            events,
            supervisor,
            flush_delay: app_context.settings.flush_delay(),
            flush_pending: false,
            dirty: false
        };

        event!(Level::DEBUG, event = worker::WORKER_STARTED, session_id = %session_id);
        state.publish(SessionEventKind::Started, None, None);

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionWorkerMessage::DispatchAction { correlation_id, action, reply } => {
                event!(Level::DEBUG, event = worker::ACTION_RECEIVED,
                       session_id = %state.session_id, action = action.name(), correlation_id = %correlation_id);

                let result = self.apply(&myself, state, &action, SessionEventKind::ActionResult, Some(correlation_id));
                match &result {
                    Ok(_) => {
                        event!(Level::DEBUG, event = worker::ACTION_APPLIED,
                               session_id = %state.session_id, action = action.name());
                    }
                    Err(e) => {
                        // caught at the top of the worker: surfaced to the
                        // awaiting caller and republished, never swallowed
                        event!(Level::ERROR, event = worker::ACTION_FAILED,
                               session_id = %state.session_id, action = action.name(), error = %e);
                        state.publish(SessionEventKind::Failed, Some(correlation_id), Some(e.to_string()));
                    }
                }
                let _ = reply.send(result);
                self.after_transition(&myself, state).await;
                Ok(())
            }
            SessionWorkerMessage::ActivityDeadline { activity_id } => {
                event!(Level::DEBUG, event = scheduler_events::TIMEOUT_FIRED,
                       session_id = %state.session_id, activity_id = %activity_id);
                let action = Action::ActivityTimeout { activity_id, force: false };
                let _ = self.apply(&myself, state, &action, SessionEventKind::ActivityTimeout, None);
                self.after_transition(&myself, state).await;
                Ok(())
            }
            SessionWorkerMessage::PhaseDeadline { activity_id, phase } => {
                // a deadline already sitting in the mailbox when the session
                // advanced must not close the phase that replaced its target;
                // abort() cannot unsend a message, so the currency check here
                // is what makes the cancellation guarantee hold
                if state.snapshot.value.active_phase() != Some((activity_id.as_str(), phase)) {
                    event!(Level::DEBUG, event = scheduler_events::STALE_DEADLINE_DROPPED,
                           session_id = %state.session_id, activity_id = %activity_id, phase = phase.as_str());
                    return Ok(());
                }
                event!(Level::DEBUG, event = scheduler_events::TIMEOUT_FIRED,
                       session_id = %state.session_id, activity_id = %activity_id, phase = phase.as_str());
                let action = Action::ActivityPartTimeout { activity_id, force: false };
                let _ = self.apply(&myself, state, &action, SessionEventKind::ActivityPartTimeout, None);
                self.after_transition(&myself, state).await;
                Ok(())
            }
            SessionWorkerMessage::WorkshopDeadline => {
                event!(Level::DEBUG, event = scheduler_events::WORKSHOP_DEADLINE_FIRED,
                       session_id = %state.session_id);
                // force the session all the way to the terminal stage from
                // wherever it stands, including a waiting room that never
                // filled (the machine ignores the activity id there)
                while !state.snapshot.value.is_terminal() {
                    let activity_id =
                        state.snapshot.value.active_phase().map(|(a, _)| a.to_string()).unwrap_or_default();
                    let action = Action::ActivityTimeout { activity_id, force: true };
                    let before = state.snapshot.value.clone();
                    let _ = self.apply(&myself, state, &action, SessionEventKind::WorkshopTimeout, None);
                    if state.snapshot.value == before {
                        break;
                    }
                }
                self.after_transition(&myself, state).await;
                Ok(())
            }
            SessionWorkerMessage::FlushSnapshot => {
                state.flush_pending = false;
                state.flush().await;
                Ok(())
            }
            SessionWorkerMessage::GetSnapshot { reply } => {
                let _ = reply.send(state.snapshot.clone());
                Ok(())
            }
        }
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        state.scheduler.clear_all();
        // the last snapshot must remain durably readable after exit
        state.flush().await;
        Ok(())
    }
}

impl SessionWorker {
    /// Apply one action through the pure machine and publish the outcome.
    fn apply(
        &self,
        myself: &ActorRef<SessionWorkerMessage>,
        state: &mut SessionWorkerState,
        action: &Action,
        kind: SessionEventKind,
        correlation_id: Option<Uuid>
    ) -> Result<ActionOutcome, SessionError> {
        let next = state.machine.send(&state.snapshot, action, Utc::now());
        let changed = next != state.snapshot;
        state.snapshot = next;

        if changed {
            state.scheduler.observe(myself, state.machine.definition(), &state.snapshot);
            state.mark_dirty(myself);
        }

        state.publish(kind, correlation_id, None);

        Ok(ActionOutcome {
            correlation_id: correlation_id.unwrap_or_else(Uuid::new_v4),
            value:          state.snapshot.value.clone(),
            context:        state.snapshot.context.clone(),
            action:         action.clone()
        })
    }

    /// Terminal handling: flush immediately and tell the supervisor.
    async fn after_transition(&self, _myself: &ActorRef<SessionWorkerMessage>, state: &mut SessionWorkerState) {
        if state.snapshot.value.is_terminal() && state.dirty {
            event!(Level::INFO, event = worker::TERMINAL_REACHED, session_id = %state.session_id);
            state.flush().await;
            let _ = state
                .supervisor
                .cast(SessionSupervisorMessage::SessionCompleted { session_id: state.session_id.clone() });
        }
    }
}
