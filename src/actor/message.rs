//! Typed messages for actor communication

use ractor::{Message, RpcReplyPort};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{
    action::Action,
    error::SessionError,
    state::{PhaseName, SessionContext, Snapshot, StateValue}
};

/// Messages for the Guardian actor (root of the actor system)
#[derive(Debug)]
pub enum GuardianMessage {
    /// Initialize the actor system
    Initialize,
    /// Dispatch an action to a session, spawning its worker if needed
    DispatchAction {
        session_id:     String,
        correlation_id: Uuid,
        action:         Action,
        reply:          RpcReplyPort<Result<ActionOutcome, SessionError>>
    },
    /// Subscribe to a session's outbound event channel
    SubscribeSession {
        session_id: String,
        reply:      RpcReplyPort<Result<broadcast::Receiver<SessionEvent>, SessionError>>
    },
    /// Shutdown the entire system
    Shutdown,
    /// System health check
    HealthCheck { reply: RpcReplyPort<SystemHealth> }
}

/// Messages for the SessionSupervisor actor
#[derive(Debug)]
pub enum SessionSupervisorMessage {
    /// Route an action to the session's worker, spawning it if needed
    DispatchAction {
        session_id:     String,
        correlation_id: Uuid,
        action:         Action,
        reply:          RpcReplyPort<Result<ActionOutcome, SessionError>>
    },
    /// Subscribe to a session's outbound event channel
    SubscribeSession {
        session_id: String,
        reply:      RpcReplyPort<Result<broadcast::Receiver<SessionEvent>, SessionError>>
    },
    /// A worker reached the terminal stage and flushed its final snapshot
    SessionCompleted { session_id: String },
    /// Get active sessions count
    GetActiveSessions { reply: RpcReplyPort<usize> }
}

/// Messages for SessionWorker actors (one per session)
#[derive(Debug)]
pub enum SessionWorkerMessage {
    /// Apply one action to the session machine
    DispatchAction {
        correlation_id: Uuid,
        action:         Action,
        reply:          RpcReplyPort<Result<ActionOutcome, SessionError>>
    },
    /// Activity-scoped deadline fired
    ActivityDeadline { activity_id: String },
    /// Phase-scoped deadline fired
    PhaseDeadline { activity_id: String, phase: PhaseName },
    /// Workshop-level deadline fired - force the session to its end
    WorkshopDeadline,
    /// Coalesced snapshot flush tick
    FlushSnapshot,
    /// Read the current snapshot (health checks, tests)
    GetSnapshot { reply: RpcReplyPort<Snapshot> }
}

/// The correlated result of one dispatched action - the worker echoes the
/// caller's correlation id so concurrent callers on the same channel can
/// match their own responses.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub correlation_id: Uuid,
    pub value:          StateValue,
    pub context:        SessionContext,
    pub action:         Action
}

impl ActionOutcome {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { value: self.value.clone(), context: self.context.clone() }
    }
}

/// Kind tag for events on a session's outbound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// Worker finished starting (snapshot restored or fresh)
    Started,
    /// Result of an externally dispatched action
    ActionResult,
    /// The workshop-level deadline forced the session forward
    WorkshopTimeout,
    /// An activity-scoped deadline closed the whole activity
    ActivityTimeout,
    /// A phase-scoped deadline closed the current phase
    ActivityPartTimeout,
    /// An uncaught failure inside the worker, republished instead of lost
    Failed
}

/// One event on a session's outbound broadcast channel
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub session_id:     String,
    pub kind:           SessionEventKind,
    /// Echoed for `ActionResult`, absent for scheduler/lifecycle events
    pub correlation_id: Option<Uuid>,
    pub snapshot:       Option<Snapshot>,
    pub error:          Option<String>
}

/// System health information
#[derive(Debug)]
pub struct SystemHealth {
    pub active_sessions: usize,
    pub uptime_seconds:  u64
}

// Implement Message trait for Ractor
impl Message for GuardianMessage {}
impl Message for SessionSupervisorMessage {}
impl Message for SessionWorkerMessage {}
