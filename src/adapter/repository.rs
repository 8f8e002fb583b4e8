//! Workshop repository implementations
//!
//! The in-memory variant backs tests and embedded use; the YAML-directory
//! variant resolves `{session_id}.yaml` files, which is all the demo driver
//! needs in place of the external relational store.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    domain::{error::SessionError, workshop::WorkshopDefinition},
    port::repository::WorkshopRepository
};

/// In-memory repository: session id -> definition.
pub struct InMemoryWorkshopRepository {
    definitions: Arc<RwLock<HashMap<String, WorkshopDefinition>>>
}

impl InMemoryWorkshopRepository {
    pub fn new() -> Self {
        Self { definitions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn insert(&self, session_id: &str, definition: WorkshopDefinition) {
        let mut definitions = self.definitions.write().await;
        definitions.insert(session_id.to_string(), definition);
    }
}

impl Default for InMemoryWorkshopRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkshopRepository for InMemoryWorkshopRepository {
    async fn resolve(&self, session_id: &str) -> Result<Option<WorkshopDefinition>, SessionError> {
        let definitions = self.definitions.read().await;
        Ok(definitions.get(session_id).cloned())
    }
}

/// Directory-of-YAML-files repository: resolves `<dir>/<session_id>.yaml`.
pub struct YamlWorkshopRepository {
    directory: PathBuf
}

impl YamlWorkshopRepository {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl WorkshopRepository for YamlWorkshopRepository {
    async fn resolve(&self, session_id: &str) -> Result<Option<WorkshopDefinition>, SessionError> {
        let path = self.directory.join(format!("{}.yaml", session_id));
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(WorkshopDefinition::from_yaml(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workshop::{Activity, ActivityKind};

    fn definition() -> WorkshopDefinition {
        WorkshopDefinition {
            name:              "kickoff".into(),
            required_profiles: 2,
            workshop_minutes:  None,
            activities:        vec![Activity {
                id:                 "warmup".into(),
                kind:               ActivityKind::Question,
                title:              None,
                activity_minutes:   None,
                individual_minutes: Some(1),
                group_minutes:      None,
                review_minutes:     None
            }]
        }
    }

    #[tokio::test]
    async fn in_memory_repository_resolves_known_sessions_only() {
        let repository = InMemoryWorkshopRepository::new();
        repository.insert("session-1", definition()).await;

        assert_eq!(repository.resolve("session-1").await.unwrap(), Some(definition()));
        assert_eq!(repository.resolve("session-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn yaml_repository_reads_per_session_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: kickoff\nrequired_profiles: 2\nactivities:\n  - id: warmup\n    kind: question\n";
        std::fs::write(dir.path().join("session-1.yaml"), yaml).unwrap();

        let repository = YamlWorkshopRepository::new(dir.path().to_path_buf());

        let resolved = repository.resolve("session-1").await.unwrap().expect("definition");
        assert_eq!(resolved.name, "kickoff");
        assert_eq!(resolved.activities[0].kind, ActivityKind::Question);

        assert!(repository.resolve("missing").await.unwrap().is_none());
    }
}
