//! Pure domain layer: definitions, the compiler and the session machine

pub mod action;
pub mod compiler;
pub mod constant;
pub mod error;
pub mod machine;
pub mod state;
pub mod workshop;
