//! Actor-based session orchestration
//!
//! This module implements an Akka-style actor architecture using Ractor:
//! one supervised worker per active session, with correlated dispatch and
//! broadcast fan-out of results.

pub mod bridge;
pub mod guardian;
pub mod message;
pub mod scheduler;
pub mod supervisor;
pub mod worker;

pub use bridge::*;
pub use guardian::*;
pub use message::*;
pub use scheduler::*;
pub use supervisor::*;
pub use worker::*;
