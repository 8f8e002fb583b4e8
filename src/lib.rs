//! # Lockstep
//!
//! A session orchestration engine for live group workshops: many
//! participants move through a chain of timed activities together, in
//! lockstep.
//!
//! This crate provides functionality to:
//! - Compile workshop definitions into an explicit chain of stages and phases
//! - Execute session transitions through a pure, replayable state machine
//! - Host one supervised actor per active session, with deadline timers
//! - Persist crash-recoverable snapshots with coalesced writes
//! - Dispatch correlated actions and fan results out to subscribers

// Public API modules
pub mod actor;
pub mod adapter;
pub mod cli;
pub mod config;
pub mod domain;
pub mod port;

// Re-export commonly used types
pub use actor::{ActionOutcome, Guardian, GuardianMessage, SessionEvent, SessionEventKind};
pub use config::{AppContext, Settings};
pub use domain::{
    action::Action,
    state::{PhaseName, Snapshot, StateValue},
    workshop::WorkshopDefinition
};
