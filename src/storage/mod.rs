//! Storage layer: the store contract, both backends, the env-driven facade,
//! and the migration helper.
//!
//! No component above this facade knows which concrete store is bound; the
//! selector runs once at process start and hands back a [`VectorStore`]
//! trait object.

/// Schema-driven persistent store with split document/embedding/content files.
pub mod local;
/// Concurrent in-memory store.
pub mod memory;
/// Record migration between stores (backup/restore).
pub mod migration;

use crate::config;
use crate::error::Result;
use crate::record::Record;
use crate::search::engine::QueryContext;
use crate::search::types::{
    AdvancedSearchRequest, SearchRequest, SearchResult, TemporalSearchRequest,
    TemporalSearchResult,
};
use std::path::PathBuf;

pub use local::{LocalStorage, LocalStoreOptions, LocalVectorStore};
pub use memory::MemoryStore;

/// The uniform storage contract implemented by every backend.
///
/// Implementations must be safe under concurrent invocation: mutations take
/// exclusive access, reads and searches take shared access, and readers
/// observe either the pre-state or post-state of each individual store call,
/// never a torn combination.
pub trait VectorStore: Send + Sync {
    /// Stores a record, assigning an id when absent. Re-storing an existing
    /// id preserves `created_at` and advances `updated_at`. Returns the
    /// record as stored.
    fn store(&self, record: Record) -> Result<Record>;

    /// Retrieves a record by id.
    fn get(&self, id: &str) -> Result<Record>;

    /// Deletes a record by id.
    fn delete(&self, id: &str) -> Result<()>;

    /// Returns a snapshot of all records.
    fn list(&self) -> Result<Vec<Record>>;

    /// Number of stored records.
    fn count(&self) -> usize;

    /// Exact vector search. See [`crate::search::engine::vector_search`].
    fn search(&self, req: &SearchRequest, ctx: &QueryContext) -> Result<Vec<SearchResult>>;

    /// Filtered search over a pre-embedded query text, with optional hybrid
    /// weighting. See [`crate::search::engine::advanced_search`].
    fn advanced_search(
        &self,
        req: &AdvancedSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<SearchResult>>;

    /// Advanced search with temporal decay.
    /// See [`crate::search::engine::temporal_search`].
    fn temporal_search(
        &self,
        req: &TemporalSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<TemporalSearchResult>>;
}

/// Which concrete store backs the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Volatile in-memory store.
    Memory,
    /// Persistent on-disk store.
    Local,
}

/// Backend selection consulted once at process start.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Which backend to open.
    pub backend: StorageBackend,
    /// Base path for the persistent store.
    pub base_path: PathBuf,
    /// Collection name used by the persistent store.
    pub collection: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            base_path: PathBuf::from(config::DEFAULT_DATA_DIR),
            collection: config::DEFAULT_COLLECTION.to_string(),
        }
    }
}

impl StorageConfig {
    /// Reads the backend selection from the environment: `VICINITY_STORAGE`
    /// (`memory` unless set to `local`), `VICINITY_DATA_DIR`, and
    /// `VICINITY_COLLECTION`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if std::env::var(config::ENV_STORAGE_TYPE).as_deref() == Ok("local") {
            cfg.backend = StorageBackend::Local;
        }
        if let Ok(path) = std::env::var(config::ENV_DATA_DIR) {
            if !path.is_empty() {
                cfg.base_path = PathBuf::from(path);
            }
        }
        if let Ok(collection) = std::env::var(config::ENV_COLLECTION) {
            if !collection.is_empty() {
                cfg.collection = collection;
            }
        }
        cfg
    }
}

/// Opens the configured backend behind the uniform contract.
pub fn open_store(cfg: &StorageConfig) -> Result<Box<dyn VectorStore>> {
    match cfg.backend {
        StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
        StorageBackend::Local => {
            let store = LocalVectorStore::open(
                &cfg.base_path,
                &cfg.collection,
                LocalStoreOptions::default(),
            )?;
            Ok(Box::new(store))
        }
    }
}
