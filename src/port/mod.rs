//! Ports - async seams to the collaborating persistence layer

pub mod repository;
pub mod store;
