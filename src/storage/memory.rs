//! Concurrent in-memory vector store.
//!
//! Records live in a map guarded by one `parking_lot::RwLock`. Mutations take
//! the write lock; reads and searches hold the read lock for the duration of
//! the scan, so the top-K is fully determined by the snapshot visible when
//! the lock was acquired. Store replaces map entries rather than mutating
//! records in place, so shared handles held by readers stay valid.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::search::engine::{self, QueryContext};
use crate::search::types::{
    AdvancedSearchRequest, SearchRequest, SearchResult, TemporalSearchRequest,
    TemporalSearchResult,
};
use crate::storage::VectorStore;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Volatile in-memory realization of the storage contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Arc<Record>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for MemoryStore {
    fn store(&self, mut record: Record) -> Result<Record> {
        record.validate()?;

        let mut records = self.records.write();
        let now = Utc::now();
        match records.get(&record.id) {
            Some(existing) => {
                record.created_at = existing.created_at;
                record.updated_at = now;
            }
            None => {
                record.created_at = now;
                record.updated_at = now;
            }
        }

        tracing::debug!(id = %record.id, created_at = %record.created_at, "record stored");
        let stored = Arc::new(record);
        records.insert(stored.id.clone(), Arc::clone(&stored));
        Ok((*stored).clone())
    }

    fn get(&self, id: &str) -> Result<Record> {
        let records = self.records.read();
        records
            .get(id)
            .map(|record| (**record).clone())
            .ok_or_else(|| Error::NotFound(format!("vector {id}")))
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write();
        if records.remove(id).is_none() {
            return Err(Error::NotFound(format!("vector {id}")));
        }
        tracing::debug!(id, "record deleted");
        Ok(())
    }

    fn list(&self) -> Result<Vec<Record>> {
        let records = self.records.read();
        Ok(records.values().map(|record| (**record).clone()).collect())
    }

    fn count(&self) -> usize {
        self.records.read().len()
    }

    fn search(&self, req: &SearchRequest, ctx: &QueryContext) -> Result<Vec<SearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.records.read();
        engine::vector_search(records.values().map(|record| record.as_ref()), &req, ctx)
    }

    fn advanced_search(
        &self,
        req: &AdvancedSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<SearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.records.read();
        engine::advanced_search(
            records.values().map(|record| record.as_ref()),
            &req,
            query_embedding,
            ctx,
        )
    }

    fn temporal_search(
        &self,
        req: &TemporalSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<TemporalSearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.records.read();
        engine::temporal_search(
            records.values().map(|record| record.as_ref()),
            &req,
            query_embedding,
            ctx,
        )
    }
}
