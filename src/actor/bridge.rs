//! Messaging bridge - correlated request/response over the actor system
//!
//! A minimal RPC layer for callers outside the actor tree: every dispatch
//! mints a fresh correlation id, sends the action through the Guardian, and
//! awaits the result whose echoed id matches. Failures inside the worker
//! come back as a rejection here, never as a hang; callers that need a
//! harder bound pass their own timeout.

use std::time::Duration;

use ractor::{
    ActorRef,
    rpc::{CallResult, call}
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    actor::message::{ActionOutcome, GuardianMessage, SessionEvent},
    domain::{action::Action, error::SessionError}
};

/// Dispatch one action to a session and await its correlated result.
pub async fn dispatch_action(
    guardian: &ActorRef<GuardianMessage>,
    session_id: &str,
    action: Action,
    timeout: Duration
) -> Result<ActionOutcome, SessionError> {
    let correlation_id = Uuid::new_v4();
    let session_id = session_id.to_string();

    match call(
        guardian,
        |reply| GuardianMessage::DispatchAction { session_id, correlation_id, action, reply },
        Some(timeout)
    )
    .await
    {
        Ok(CallResult::Success(Ok(outcome))) => {
            debug_assert_eq!(outcome.correlation_id, correlation_id);
            Ok(outcome)
        }
        Ok(CallResult::Success(Err(e))) => Err(e),
        Ok(CallResult::Timeout) => Err(SessionError::Timeout("action dispatch timed out".to_string())),
        Ok(CallResult::SenderError) => Err(SessionError::Dispatch("dispatch reply dropped".to_string())),
        Err(e) => Err(SessionError::Dispatch(format!("failed to reach actor system: {}", e)))
    }
}

/// Subscribe to a session's outbound event channel, spawning its worker if
/// the session is not yet live.
pub async fn subscribe_session(
    guardian: &ActorRef<GuardianMessage>,
    session_id: &str,
    timeout: Duration
) -> Result<broadcast::Receiver<SessionEvent>, SessionError> {
    let session_id = session_id.to_string();

    match call(guardian, |reply| GuardianMessage::SubscribeSession { session_id, reply }, Some(timeout)).await {
        Ok(CallResult::Success(result)) => result,
        Ok(CallResult::Timeout) => Err(SessionError::Timeout("subscribe timed out".to_string())),
        Ok(CallResult::SenderError) => Err(SessionError::Dispatch("subscribe reply dropped".to_string())),
        Err(e) => Err(SessionError::Dispatch(format!("failed to reach actor system: {}", e)))
    }
}
