//! SessionSupervisor Actor - one worker per active session
//!
//! The supervisor is responsible for liveness only, never for orchestration:
//! given a session id it finds the previously recorded worker or spawns a
//! fresh one, waits for its readiness (the spawn future resolves only after
//! `pre_start` - a missing definition fails the spawn instead of hanging the
//! caller), and records the session-id<->worker mapping both ways. Actions
//! are routed to the worker over a correlated RPC call with a caller-side
//! timeout.

use std::collections::HashMap;

use ractor::{
    Actor, ActorId, ActorProcessingErr, ActorRef, SupervisionEvent,
    rpc::{CallResult, call}
};
use tokio::sync::broadcast;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    actor::{
        message::{
            ActionOutcome, SessionEvent, SessionEventKind, SessionSupervisorMessage, SessionWorkerMessage
        },
        worker::SessionWorker
    },
    config::AppContext,
    domain::{action::Action, constant::supervisor, error::SessionError}
};

/// Outbound channel capacity per session; slow subscribers lag, the snapshot
/// store remains the source of truth.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// One recorded worker: its ref plus the session's broadcast sender.
struct WorkerHandle {
    worker: ActorRef<SessionWorkerMessage>,
    events: broadcast::Sender<SessionEvent>
}

/// SessionSupervisor Actor State - the bidirectional session<->worker map
pub struct SessionSupervisorState {
    /// session_id -> worker handle
    workers:                HashMap<String, WorkerHandle>,
    /// worker actor id -> session_id (for supervision events)
    sessions:               HashMap<ActorId, String>,
    /// Shared application context
    app_context:            AppContext,
    /// Statistics for monitoring and health checks
    total_sessions_created: u64,
    /// Total actions routed
    total_actions_routed:   u64,
    /// Total workers failed
    total_workers_failed:   u64
}

/// SessionSupervisor Actor - ensures exactly one worker per active session
pub struct SessionSupervisor;

#[async_trait::async_trait]
impl Actor for SessionSupervisor {
    type Arguments = AppContext;
    type Msg = SessionSupervisorMessage;
    type State = SessionSupervisorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        app_context: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = supervisor::SUPERVISOR_STARTED);

        Ok(SessionSupervisorState {
            workers: HashMap::new(),
            sessions: HashMap::new(),
            app_context,
            total_sessions_created: 0,
            total_actions_routed: 0,
            total_workers_failed: 0
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SessionSupervisorMessage::DispatchAction { session_id, correlation_id, action, reply } => {
                let result = self.dispatch(&myself, &session_id, correlation_id, action, state).await;
                if result.is_ok() {
                    state.total_actions_routed += 1;
                }
                if let Err(e) = reply.send(result) {
                    event!(Level::ERROR, event = supervisor::REPLY_FAILED, session_id = %session_id, error = %e);
                }
                Ok(())
            }
            SessionSupervisorMessage::SubscribeSession { session_id, reply } => {
                let result = self
                    .ensure_worker(&myself, &session_id, state)
                    .await
                    .map(|_| state.workers[&session_id].events.subscribe());
                if let Err(e) = reply.send(result) {
                    event!(Level::ERROR, event = supervisor::REPLY_FAILED, session_id = %session_id, error = %e);
                }
                Ok(())
            }
            SessionSupervisorMessage::SessionCompleted { session_id } => {
                self.handle_session_completed(session_id, state);
                Ok(())
            }
            SessionSupervisorMessage::GetActiveSessions { reply } => {
                if let Err(e) = reply.send(state.workers.len()) {
                    event!(Level::ERROR, event = supervisor::REPLY_FAILED, error = %e);
                }
                Ok(())
            }
        }
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        event: SupervisionEvent,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match event {
            SupervisionEvent::ActorStarted(_) => {}
            SupervisionEvent::ActorFailed(cell, error) => {
                if let Some(session_id) = state.sessions.remove(&cell.get_id()) {
                    event!(Level::ERROR, event = supervisor::WORKER_FAILED,
                           session_id = %session_id, error = %error);
                    state.total_workers_failed += 1;

                    // republish the failure on the session's channel so any
                    // subscriber sees a rejection instead of silence
                    if let Some(handle) = state.workers.remove(&session_id) {
                        let _ = handle.events.send(SessionEvent {
                            session_id:     session_id.clone(),
                            kind:           SessionEventKind::Failed,
                            correlation_id: None,
                            snapshot:       None,
                            error:          Some(error.to_string())
                        });
                    }
                }
            }
            SupervisionEvent::ActorTerminated(cell, _, _) => {
                if let Some(session_id) = state.sessions.remove(&cell.get_id()) {
                    event!(Level::DEBUG, event = supervisor::WORKER_TERMINATED, session_id = %session_id);
                    state.workers.remove(&session_id);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl SessionSupervisor {
    /// Find the recorded worker for a session, or spawn one and record the
    /// mapping bidirectionally. Returns only after the worker is ready.
    async fn ensure_worker(
        &self,
        myself: &ActorRef<SessionSupervisorMessage>,
        session_id: &str,
        state: &mut SessionSupervisorState
    ) -> Result<ActorRef<SessionWorkerMessage>, SessionError> {
        if let Some(handle) = state.workers.get(session_id) {
            event!(Level::DEBUG, event = supervisor::WORKER_REUSED, session_id = %session_id);
            return Ok(handle.worker.clone());
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        // anonymous spawn: the maps above are the registry, and concurrent
        // actor systems in one process never contend on a global name
        match Actor::spawn_linked(
            None,
            SessionWorker,
            (session_id.to_string(), state.app_context.clone(), myself.clone(), events.clone()),
            myself.get_cell()
        )
        .await
        {
            Ok((worker, _handle)) => {
                state.sessions.insert(worker.get_id(), session_id.to_string());
                state.workers.insert(session_id.to_string(), WorkerHandle { worker: worker.clone(), events });
                state.total_sessions_created += 1;

                event!(Level::DEBUG, event = supervisor::WORKER_SPAWNED,
                       session_id = %session_id, total_sessions = %state.total_sessions_created);
                Ok(worker)
            }
            Err(e) => {
                event!(Level::ERROR, event = supervisor::WORKER_SPAWN_FAILED,
                       session_id = %session_id, error = %e);
                Err(SessionError::from(e))
            }
        }
    }

    /// Route one action to the session's worker and await the correlated
    /// result.
    async fn dispatch(
        &self,
        myself: &ActorRef<SessionSupervisorMessage>,
        session_id: &str,
        correlation_id: Uuid,
        action: Action,
        state: &mut SessionSupervisorState
    ) -> Result<ActionOutcome, SessionError> {
        let worker = self.ensure_worker(myself, session_id, state).await?;
        let timeout = state.app_context.settings.dispatch_timeout();

        event!(Level::DEBUG, event = supervisor::ACTION_ROUTED,
               session_id = %session_id, action = action.name(), correlation_id = %correlation_id);

        match call(
            &worker,
            |reply| SessionWorkerMessage::DispatchAction { correlation_id, action, reply },
            Some(timeout)
        )
        .await
        {
            Ok(CallResult::Success(result)) => result,
            Ok(CallResult::Timeout) => {
                Err(SessionError::Timeout(format!("action for session '{}' timed out", session_id)))
            }
            Ok(CallResult::SenderError) => {
                Err(SessionError::Dispatch(format!("reply channel for session '{}' dropped", session_id)))
            }
            Err(e) => Err(SessionError::Dispatch(format!("worker for session '{}' unreachable: {}", session_id, e)))
        }
    }

    /// A worker reached the terminal stage; drop both directions of the
    /// mapping and stop it. The final snapshot already hit the store.
    fn handle_session_completed(&self, session_id: String, state: &mut SessionSupervisorState) {
        event!(Level::DEBUG, event = supervisor::SESSION_COMPLETED, session_id = %session_id);

        if let Some(handle) = state.workers.remove(&session_id) {
            state.sessions.remove(&handle.worker.get_id());
            handle.worker.stop(None);
        }
    }
}
