//! # Lockstep Session Driver
//!
//! A command-line driver for the session orchestration engine.
//!
//! ## Usage
//!
//! ```bash
//! # Drive a session: one JSON action per stdin line, one JSON result per stdout line
//! echo '{"kind":"join","profileId":"ada"}' | lockstep run team-kickoff
//!
//! # Follow a session's event stream
//! lockstep watch team-kickoff
//!
//! # Print system health
//! lockstep health
//! ```
//!
//! Workshop definitions are resolved as `<workshops>/<session_id>.yaml`;
//! snapshots land in the platform data directory unless `--data-dir` says
//! otherwise. A restarted driver resumes each session from its last
//! persisted snapshot.

use clap::Parser;
use ractor::rpc::{CallResult, call};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use lockstep::{
    actor::{Guardian, GuardianMessage, bridge},
    cli::{Cli, Commands},
    config::AppContext,
    domain::{action::Action, error::SessionError}
};

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lockstep=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let app_context = AppContext::init(cli.workshops, cli.data_dir)?;
    let dispatch_timeout = app_context.settings.dispatch_timeout();

    let guardian_ref = Guardian::spawn_system(app_context)
        .await
        .map_err(|e| SessionError::Generic(format!("Failed to start actor system: {}", e)))?;

    let result = match cli.command {
        Commands::Run { session_id } => run_session(&guardian_ref, &session_id, dispatch_timeout).await,
        Commands::Watch { session_id } => watch_session(&guardian_ref, &session_id, dispatch_timeout).await,
        Commands::Health => print_health(&guardian_ref).await
    };

    if let Err(e) = guardian_ref.cast(GuardianMessage::Shutdown) {
        eprintln!("Failed to shutdown actor system: {:?}", e);
    }

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    result
}

/// Read JSON actions line by line and print each correlated result.
async fn run_session(
    guardian_ref: &ractor::ActorRef<GuardianMessage>,
    session_id: &str,
    timeout: std::time::Duration
) -> Result<(), SessionError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let action: Action = serde_json::from_str(line)?;

        match bridge::dispatch_action(guardian_ref, session_id, action, timeout).await {
            Ok(outcome) => {
                let output = json!({
                    "correlationId": outcome.correlation_id.to_string(),
                    "action": outcome.action,
                    "snapshot": outcome.snapshot()
                });
                println!("{}", output);
            }
            Err(e) => {
                let output = json!({ "error": e.to_string() });
                println!("{}", output);
            }
        }
    }

    Ok(())
}

/// Print every event on a session's broadcast channel until it closes.
async fn watch_session(
    guardian_ref: &ractor::ActorRef<GuardianMessage>,
    session_id: &str,
    timeout: std::time::Duration
) -> Result<(), SessionError> {
    let mut events = bridge::subscribe_session(guardian_ref, session_id, timeout).await?;

    while let Ok(event) = events.recv().await {
        let output = json!({
            "sessionId": event.session_id,
            "kind": format!("{:?}", event.kind),
            "correlationId": event.correlation_id.map(|id| id.to_string()),
            "snapshot": event.snapshot,
            "error": event.error
        });
        println!("{}", output);
    }

    Ok(())
}

async fn print_health(guardian_ref: &ractor::ActorRef<GuardianMessage>) -> Result<(), SessionError> {
    match call(guardian_ref, |reply| GuardianMessage::HealthCheck { reply }, None).await {
        Ok(CallResult::Success(health)) => {
            let output = json!({
                "activeSessions": health.active_sessions,
                "uptimeSeconds": health.uptime_seconds
            });
            println!("{}", output);
            Ok(())
        }
        Ok(_) => Err(SessionError::Generic("Health check reply dropped".to_string())),
        Err(e) => Err(SessionError::Generic(format!("Failed to reach actor system: {}", e)))
    }
}
