use async_trait::async_trait;

use crate::domain::{error::SessionError, workshop::WorkshopDefinition};

/// Port for resolving the workshop definition behind a session id.
///
/// Stands in for the external relational store that owns workshop, activity
/// and participant records; the worker calls it exactly once, at startup.
#[async_trait]
pub trait WorkshopRepository: Send + Sync {
    /// Resolve the definition for a session; `None` means the session is
    /// unknown and the worker must not start
    async fn resolve(&self, session_id: &str) -> Result<Option<WorkshopDefinition>, SessionError>;
}
