use async_trait::async_trait;

use crate::domain::{error::SessionError, state::Snapshot};

/// Port for persisting and restoring session snapshots.
///
/// The snapshot is the only unit ever persisted; absence of a stored value
/// means "session not yet started". `save` always overwrites - the store
/// keeps exactly the latest snapshot per session.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the latest snapshot for a session, if one was ever written
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, SessionError>;

    /// Overwrite the stored snapshot for a session
    async fn save(&self, session_id: &str, snapshot: &Snapshot) -> Result<(), SessionError>;
}
