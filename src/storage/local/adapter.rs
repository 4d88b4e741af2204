//! Record ⇄ document adapter implementing the storage contract over one
//! collection of a [`LocalStorage`].
//!
//! Records map onto text documents: string metadata becomes JSON metadata, a
//! `text` metadata value becomes inline text content, comma-separated `tags`
//! become document tags, and the `embedder.name` value is recorded as the
//! embedding's model tag. Search variants run the shared query engine over
//! the collection's records with side-file embeddings resolved.

use crate::config;
use crate::error::Result;
use crate::record::Record;
use crate::search::engine::{self, QueryContext};
use crate::search::types::{
    AdvancedSearchRequest, SearchRequest, SearchResult, TemporalSearchRequest,
    TemporalSearchResult,
};
use crate::storage::VectorStore;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::schema::{
    CollectionSchema, ContentData, Document, DocumentType, EmbeddingData, FieldDefinition,
    FieldType, Metric, VectorConfig,
};
use super::store::{metadata_strings, LocalStorage, LocalStoreOptions};

/// Persistent realization of the storage contract, bound to one collection.
#[derive(Debug)]
pub struct LocalVectorStore {
    storage: LocalStorage,
    collection: String,
}

impl LocalVectorStore {
    /// Opens storage at `base_path` and bootstraps the collection with a
    /// default schema when it does not exist yet.
    pub fn open(
        base_path: impl AsRef<Path>,
        collection: &str,
        options: LocalStoreOptions,
    ) -> Result<Self> {
        let storage = LocalStorage::open(base_path, options)?;

        if storage.get_collection(collection).is_err() {
            let schema = CollectionSchema {
                fields: HashMap::from([
                    (
                        "type".to_string(),
                        FieldDefinition::indexed(FieldType::String),
                    ),
                    (
                        "author".to_string(),
                        FieldDefinition::indexed(FieldType::String),
                    ),
                    ("text".to_string(), FieldDefinition::plain(FieldType::String)),
                    (
                        "embedder.name".to_string(),
                        FieldDefinition::indexed(FieldType::String),
                    ),
                ]),
                required: Vec::new(),
                vector_config: Some(VectorConfig {
                    dimension: config::DEFAULT_VECTOR_DIMENSION,
                    embedder_type: "local".to_string(),
                    metric: Metric::Cosine,
                }),
            };
            storage.create_collection(collection, "Vector embeddings collection", Some(schema))?;
        }

        Ok(Self {
            storage,
            collection: collection.to_string(),
        })
    }

    /// The underlying document storage, for collection-level operations
    /// (export/import, schema inspection).
    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// The collection this store reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Persists the schema. Call before dropping the store.
    pub fn close(&self) -> Result<()> {
        self.storage.close()
    }

    fn load_records(&self) -> Result<Vec<Record>> {
        let docs = self.storage.list_documents(&self.collection)?;
        Ok(docs.iter().map(document_to_record).collect())
    }
}

impl VectorStore for LocalVectorStore {
    fn store(&self, mut record: Record) -> Result<Record> {
        record.validate()?;
        let doc = record_to_document(&record);
        let stored = self.storage.store_document(&self.collection, doc)?;
        Ok(Record {
            id: stored.id,
            embedding: record.embedding,
            metadata: record.metadata,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn get(&self, id: &str) -> Result<Record> {
        let doc = self.storage.get_document(&self.collection, id)?;
        Ok(document_to_record(&doc))
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete_document(&self.collection, id)
    }

    fn list(&self) -> Result<Vec<Record>> {
        self.load_records()
    }

    fn count(&self) -> usize {
        self.storage
            .get_collection(&self.collection)
            .map(|c| c.stats.document_count)
            .unwrap_or(0)
    }

    fn search(&self, req: &SearchRequest, ctx: &QueryContext) -> Result<Vec<SearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.load_records()?;
        engine::vector_search(records.iter(), &req, ctx)
    }

    fn advanced_search(
        &self,
        req: &AdvancedSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<SearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.load_records()?;
        engine::advanced_search(records.iter(), &req, query_embedding, ctx)
    }

    fn temporal_search(
        &self,
        req: &TemporalSearchRequest,
        query_embedding: &[f64],
        ctx: &QueryContext,
    ) -> Result<Vec<TemporalSearchResult>> {
        let mut req = req.clone();
        req.validate()?;
        let records = self.load_records()?;
        engine::temporal_search(records.iter(), &req, query_embedding, ctx)
    }
}

fn document_to_record(doc: &Document) -> Record {
    Record {
        id: doc.id.clone(),
        embedding: doc
            .embedding
            .as_ref()
            .map(|e| e.vector.clone())
            .unwrap_or_default(),
        metadata: metadata_strings(doc),
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    }
}

fn record_to_document(record: &Record) -> Document {
    let mut doc = Document::new(record.id.clone(), DocumentType::Text);
    doc.created_at = record.created_at;
    doc.updated_at = record.updated_at;
    doc.metadata = record
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    doc.embedding = Some(EmbeddingData {
        vector: record.embedding.clone(),
        dimension: record.embedding.len(),
        model: embedder_name(&record.metadata),
        created_at: Utc::now(),
        path: None,
    });
    doc.tags = extract_tags(&record.metadata);
    if let Some(text) = record.metadata.get("text") {
        doc.content = Some(ContentData::text(text.clone()));
    }
    doc
}

fn embedder_name(metadata: &HashMap<String, String>) -> String {
    metadata
        .get("embedder.name")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn extract_tags(metadata: &HashMap<String, String>) -> Vec<String> {
    metadata
        .get("tags")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
