//! Settings and the shared application context

use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    adapter::{
        repository::{InMemoryWorkshopRepository, YamlWorkshopRepository},
        store::{InMemorySnapshotStore, StoreFactory, StoreType}
    },
    port::{repository::WorkshopRepository, store::SnapshotStore}
};

/// Configuration for the session orchestration engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Caller-side timeout for one dispatched action, in milliseconds
    pub dispatch_timeout_ms: u64,
    /// Delay before a scheduled snapshot flush runs; transitions landing
    /// within the window are coalesced into one write
    pub flush_delay_ms:      u64
}

impl Default for Settings {
    fn default() -> Self {
        Self { dispatch_timeout_ms: 30_000, flush_delay_ms: 25 }
    }
}

impl Settings {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }
}

/// Get the project directories for cross-platform data path resolution
pub fn get_project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "lockstep").context("Failed to determine project directories")
}

/// Get the snapshot database path
pub fn get_snapshot_db_path() -> Result<PathBuf> {
    let project_dirs = get_project_dirs()?;
    Ok(project_dirs.data_dir().join("snapshots"))
}

/// Get the config file path
pub fn get_config_file_path() -> Result<PathBuf> {
    let project_dirs = get_project_dirs()?;
    Ok(project_dirs.config_dir().join("config.yaml"))
}

/// Load settings from file or create defaults if the file doesn't exist
pub fn load_settings() -> Result<Settings> {
    let config_path = get_config_file_path()?;

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config at {}", config_path.display()))?;

        serde_yaml::from_str(&content).with_context(|| "Failed to parse config file")
    } else {
        let settings = Settings::default();
        save_settings(&settings)?;
        Ok(settings)
    }
}

/// Save settings to file
pub fn save_settings(settings: &Settings) -> Result<()> {
    let config_path = get_config_file_path()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_yaml::to_string(settings)?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}

/// Shared application context injected into the actor tree: the two ports
/// plus the settings every worker reads.
#[derive(Clone)]
pub struct AppContext {
    pub settings:   Settings,
    pub repository: Arc<dyn WorkshopRepository>,
    pub snapshots:  Arc<dyn SnapshotStore>
}

impl AppContext {
    /// Production context: YAML workshop directory + RocksDB snapshots
    pub fn init(workshop_dir: PathBuf, data_dir: Option<PathBuf>) -> Result<Self> {
        let settings = load_settings()?;
        let db_path = match data_dir {
            Some(dir) => dir,
            None => get_snapshot_db_path()?
        };
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        Ok(Self {
            settings,
            repository: Arc::new(YamlWorkshopRepository::new(workshop_dir)),
            snapshots: StoreFactory::create(StoreType::RocksDb(db_path))?
        })
    }

    /// Fully in-memory context for tests and embedded use
    pub fn in_memory(repository: Arc<InMemoryWorkshopRepository>) -> Self {
        Self {
            settings:   Settings::default(),
            repository: repository as Arc<dyn WorkshopRepository>,
            snapshots:  Arc::new(InMemorySnapshotStore::new())
        }
    }

    /// Replace the snapshot store (tests inject a pre-seeded one)
    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Replace the settings (tests shrink the flush window)
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }
}
