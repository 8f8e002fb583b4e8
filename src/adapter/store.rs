//! Snapshot store implementations - pluggable persistence
//!
//! Two backends behind the same port:
//! - InMemorySnapshotStore: for development/testing
//! - RocksDbSnapshotStore: durable, for production

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use rocksdb::{ColumnFamily, DB, Options};
use tokio::sync::RwLock;
use tracing::{Level, event};

use crate::{
    domain::{constant::store, error::SessionError, state::Snapshot},
    port::store::SnapshotStore
};

/// Column family names for different data types
const CF_SNAPSHOTS: &str = "snapshots";
const CF_META: &str = "meta";

/// In-memory snapshot store.
///
/// Simple HashMap-based storage keyed by session id; the actor tests and the
/// in-memory app context use it.
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self { snapshots: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, SessionError> {
        let store = self.snapshots.read().await;
        Ok(store.get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, snapshot: &Snapshot) -> Result<(), SessionError> {
        let mut store = self.snapshots.write().await;
        store.insert(session_id.to_string(), snapshot.clone());
        Ok(())
    }
}

/// RocksDB snapshot store.
///
/// One JSON-serialized snapshot per session id in a dedicated column family.
/// Writes are point puts - the worker already coalesces bursts, so there is
/// no batching to do here.
pub struct RocksDbSnapshotStore {
    db: Arc<DB>
}

impl RocksDbSnapshotStore {
    /// Open (or create) the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Small values, frequent overwrites of the same key
        opts.set_write_buffer_size(16 * 1024 * 1024);
        opts.set_max_write_buffer_number(3);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let cf_names = vec![CF_SNAPSHOTS, CF_META];

        let db = DB::open_cf(&opts, path, &cf_names)
            .map_err(|e| SessionError::Configuration(format!("Failed to open RocksDB: {}", e)))?;

        event!(Level::DEBUG, event = store::STORE_OPENED);
        Ok(Self { db: Arc::new(db) })
    }

    fn get_cf(&self) -> Result<&ColumnFamily, SessionError> {
        self.db
            .cf_handle(CF_SNAPSHOTS)
            .ok_or_else(|| SessionError::Configuration(format!("Column family '{}' not found", CF_SNAPSHOTS)))
    }
}

#[async_trait]
impl SnapshotStore for RocksDbSnapshotStore {
    async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, SessionError> {
        let cf = self.get_cf()?;

        if let Some(data) = self
            .db
            .get_cf(cf, session_id)
            .map_err(|e| SessionError::Snapshot(format!("Failed to get snapshot: {}", e)))?
        {
            let snapshot: Snapshot =
                serde_json::from_slice(&data).map_err(|e| SessionError::Serialization(e.to_string()))?;

            event!(Level::DEBUG, event = store::SNAPSHOT_LOADED, session_id = %session_id);
            Ok(Some(snapshot))
        } else {
            event!(Level::DEBUG, event = store::SNAPSHOT_MISSING, session_id = %session_id);
            Ok(None)
        }
    }

    async fn save(&self, session_id: &str, snapshot: &Snapshot) -> Result<(), SessionError> {
        let cf = self.get_cf()?;

        let data = serde_json::to_vec(snapshot).map_err(|e| SessionError::Serialization(e.to_string()))?;

        self.db
            .put_cf(cf, session_id, &data)
            .map_err(|e| SessionError::Snapshot(format!("Failed to save snapshot: {}", e)))?;

        event!(Level::DEBUG, event = store::SNAPSHOT_SAVED, session_id = %session_id);
        Ok(())
    }
}

/// Store factory - configuration-driven backend selection
pub enum StoreType {
    InMemory,
    RocksDb(std::path::PathBuf)
}

pub struct StoreFactory;

impl StoreFactory {
    pub fn create(store_type: StoreType) -> Result<Arc<dyn SnapshotStore>, SessionError> {
        match store_type {
            StoreType::InMemory => Ok(Arc::new(InMemorySnapshotStore::new())),
            StoreType::RocksDb(path) => Ok(Arc::new(RocksDbSnapshotStore::open(path)?))
        }
    }
}
