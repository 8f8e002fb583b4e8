//! Guardian Actor - Root Supervisor
//!
//! The Guardian is the root of the actor hierarchy and manages system-wide
//! concerns:
//! - Spawns and supervises the SessionSupervisor
//! - Handles system initialization and shutdown
//! - Provides health checks and forwards dispatch/subscribe requests

use std::time::SystemTime;

use ractor::{
    Actor, ActorProcessingErr, ActorRef, SpawnErr, SupervisionEvent,
    rpc::{CallResult, call}
};
use tracing::{Level, event};

use crate::{
    actor::{
        message::{GuardianMessage, SessionSupervisorMessage, SystemHealth},
        supervisor::SessionSupervisor
    },
    config::AppContext,
    domain::{constant::guardian, error::SessionError}
};

/// Guardian Actor State - tracks child actors and system metrics
pub struct GuardianState {
    /// SessionSupervisor actor reference
    session_supervisor: Option<ActorRef<SessionSupervisorMessage>>,
    /// Shared application context, handed to the supervisor on init
    app_context:        AppContext,
    /// System startup time for uptime calculation
    startup_time:       SystemTime,
    /// System initialization flag
    is_initialized:     bool
}

/// Guardian Actor - Root supervisor of the actor system
pub struct Guardian;

#[async_trait::async_trait]
impl Actor for Guardian {
    type Arguments = AppContext;
    type Msg = GuardianMessage;
    type State = GuardianState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        app_context: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = guardian::GUARDIAN_STARTED);

        Ok(GuardianState {
            session_supervisor: None,
            app_context,
            startup_time: SystemTime::now(),
            is_initialized: false
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            GuardianMessage::Initialize => self.handle_initialize(myself, state).await,
            GuardianMessage::Shutdown => self.handle_shutdown(state).await,
            GuardianMessage::HealthCheck { reply } => self.handle_health_check(reply, state).await,
            GuardianMessage::DispatchAction { session_id, correlation_id, action, reply } => {
                let result = match &state.session_supervisor {
                    Some(supervisor) => {
                        forward(
                            supervisor,
                            |sup_reply| SessionSupervisorMessage::DispatchAction {
                                session_id,
                                correlation_id,
                                action,
                                reply: sup_reply
                            }
                        )
                        .await
                    }
                    None => Err(SessionError::Generic("actor system not initialized".to_string()))
                };
                if let Err(e) = reply.send(result) {
                    event!(Level::ERROR, event = guardian::REPLY_FAILED, error = %e);
                }
                Ok(())
            }
            GuardianMessage::SubscribeSession { session_id, reply } => {
                let result = match &state.session_supervisor {
                    Some(supervisor) => {
                        forward(supervisor, |sup_reply| SessionSupervisorMessage::SubscribeSession {
                            session_id,
                            reply: sup_reply
                        })
                        .await
                    }
                    None => Err(SessionError::Generic("actor system not initialized".to_string()))
                };
                if let Err(e) = reply.send(result) {
                    event!(Level::ERROR, event = guardian::REPLY_FAILED, error = %e);
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
        if let SupervisionEvent::ActorFailed(_, error) = event {
            event!(Level::ERROR, event = guardian::CHILDREN_SPAWN_FAILED, error = %error);
            state.session_supervisor = None;
            state.is_initialized = false;
        }
        Ok(())
    }
}

impl Guardian {
    /// Spawn the complete actor system
    pub async fn spawn_system(app_context: AppContext) -> Result<ActorRef<GuardianMessage>, SpawnErr> {
        let (guardian_ref, _handle) = Actor::spawn(None, Guardian, app_context).await?;

        // Initialize the system
        if let Err(e) = guardian_ref.cast(GuardianMessage::Initialize) {
            event!(Level::ERROR, event = guardian::INITIALIZE_FAILED, error = ?e);
        }

        Ok(guardian_ref)
    }

    /// Initialize child actors
    async fn handle_initialize(
        &self,
        myself: ActorRef<GuardianMessage>,
        state: &mut GuardianState
    ) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = guardian::CHILDREN_SPAWNING);

        match Actor::spawn_linked(
            None,
            SessionSupervisor,
            state.app_context.clone(),
            myself.get_cell()
        )
        .await
        {
            Ok((supervisor_ref, _handle)) => {
                state.session_supervisor = Some(supervisor_ref);
                state.is_initialized = true;
                event!(Level::DEBUG, event = guardian::CHILDREN_SPAWNED, actor = "session_supervisor");
            }
            Err(e) => {
                event!(Level::ERROR, event = guardian::CHILDREN_SPAWN_FAILED,
                       actor = "session_supervisor", error = %e);
                return Err(ActorProcessingErr::from(SessionError::from(e)));
            }
        }

        event!(Level::INFO, event = guardian::SYSTEM_INITIALIZED);
        Ok(())
    }

    /// Shutdown child actors gracefully
    async fn handle_shutdown(&self, state: &mut GuardianState) -> Result<(), ActorProcessingErr> {
        event!(Level::DEBUG, event = guardian::SYSTEM_SHUTDOWN_STARTED);

        if let Some(supervisor) = state.session_supervisor.take() {
            supervisor.stop(None);
        }

        state.is_initialized = false;
        event!(Level::INFO, event = guardian::SYSTEM_SHUTDOWN_COMPLETED);
        Ok(())
    }

    /// Handle health check requests
    async fn handle_health_check(
        &self,
        reply: ractor::RpcReplyPort<SystemHealth>,
        state: &GuardianState
    ) -> Result<(), ActorProcessingErr> {
        let uptime_seconds = state.startup_time.elapsed().unwrap_or_default().as_secs();

        let active_sessions = if let Some(supervisor) = &state.session_supervisor {
            match call(supervisor, |reply| SessionSupervisorMessage::GetActiveSessions { reply }, None).await {
                Ok(CallResult::Success(count)) => count,
                _ => 0
            }
        } else {
            0
        };

        let health = SystemHealth { active_sessions, uptime_seconds };

        event!(Level::DEBUG, event = guardian::HEALTH_CHECK_COMPLETED,
               active_sessions = %active_sessions, uptime_seconds = %uptime_seconds);

        if let Err(e) = reply.send(health) {
            event!(Level::ERROR, event = guardian::REPLY_FAILED, error = %e);
        }

        Ok(())
    }
}

/// Forward a request to the supervisor, collapsing the `CallResult` ladder
/// into the session error the outer caller expects.
async fn forward<T, F>(
    supervisor: &ActorRef<SessionSupervisorMessage>,
    make_message: F
) -> Result<T, SessionError>
where
    T: Send + 'static,
    F: FnOnce(ractor::RpcReplyPort<Result<T, SessionError>>) -> SessionSupervisorMessage
{
    match call(supervisor, make_message, None).await {
        Ok(CallResult::Success(result)) => result,
        Ok(CallResult::Timeout) => Err(SessionError::Timeout("supervisor call timed out".to_string())),
        Ok(CallResult::SenderError) => Err(SessionError::Dispatch("supervisor reply dropped".to_string())),
        Err(e) => Err(SessionError::Dispatch(format!("supervisor unreachable: {}", e)))
    }
}
