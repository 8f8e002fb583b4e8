//! Adapters - concrete implementations of the ports

pub mod repository;
pub mod store;
