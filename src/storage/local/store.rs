//! File-backed persistent storage with a schema registry.
//!
//! One `RwLock` guards the schema and the in-memory document map together, so
//! readers always observe a consistent pairing of the two. Mutations write
//! document and embedding files first, then update in-memory state, then
//! persist the schema: an I/O failure leaves the schema un-updated.

use crate::config;
use crate::error::{Error, Result};
use crate::filter::{self, Filters};
use crate::record::unix_epoch;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::schema::{
    Collection, CollectionSchema, ContentData, Document, EmbeddingData, StorageMetadata,
    StorageSchema,
};

const METADATA_FILE: &str = "metadata.json";
const COLLECTIONS_DIR: &str = "collections";
const EMBEDDINGS_DIR: &str = "embeddings";
const CONTENT_DIR: &str = "content";

/// Tuning options for a [`LocalStorage`] instance.
#[derive(Debug, Clone)]
pub struct LocalStoreOptions {
    /// Maximum serialized size (bytes) of an embedding kept inline in the
    /// document file. Larger embeddings move to a side file under
    /// `embeddings/` and are loaded lazily on read.
    pub embedding_inline_max_bytes: usize,
}

impl Default for LocalStoreOptions {
    fn default() -> Self {
        Self {
            embedding_inline_max_bytes: config::EMBEDDING_INLINE_MAX_BYTES,
        }
    }
}

/// Whole-collection dump format used by export/import.
#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionExport {
    pub collection: Collection,
    pub documents: Vec<Document>,
}

/// Storage-level summary returned by [`LocalStorage::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub version: u32,
    pub collections: usize,
    pub total_documents: usize,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug)]
struct Inner {
    schema: StorageSchema,
    documents: HashMap<String, HashMap<String, Document>>,
}

/// Schema-aware on-disk store. See the module docs for the layout.
#[derive(Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    options: LocalStoreOptions,
    inner: RwLock<Inner>,
}

impl LocalStorage {
    /// Opens (or initializes) storage at the given base path.
    ///
    /// An existing `metadata.json` must parse and carry the supported numeric
    /// version; anything else fails with `storage_corrupt`. Documents of
    /// registered collections are loaded into memory; embeddings stay in
    /// their side files until read.
    pub fn open(base_path: impl AsRef<Path>, options: LocalStoreOptions) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let metadata_path = base_path.join(METADATA_FILE);
        let schema = if metadata_path.exists() {
            let raw = fs::read(&metadata_path)?;
            let schema: StorageSchema = serde_json::from_slice(&raw)
                .map_err(|e| Error::Corrupt(format!("schema unreadable: {e}")))?;
            if schema.version != config::SCHEMA_VERSION {
                return Err(Error::Corrupt(format!(
                    "unsupported schema version {} (expected {})",
                    schema.version,
                    config::SCHEMA_VERSION
                )));
            }
            tracing::info!(
                version = schema.version,
                collections = schema.collections.len(),
                "loaded storage schema"
            );
            schema
        } else {
            let now = Utc::now();
            let schema = StorageSchema {
                version: config::SCHEMA_VERSION,
                created_at: now,
                updated_at: now,
                metadata: StorageMetadata {
                    name: "vicinity-storage".to_string(),
                    description: "Local file storage for vector records".to_string(),
                    tags: vec!["vector".into(), "embeddings".into(), "multimodal".into()],
                    properties: HashMap::new(),
                },
                collections: HashMap::new(),
            };
            write_json_atomic(&metadata_path, &schema)?;
            schema
        };

        let mut documents = HashMap::new();
        for name in schema.collections.keys() {
            documents.insert(name.clone(), load_documents(&base_path, name));
        }

        Ok(Self {
            base_path,
            options,
            inner: RwLock::new(Inner { schema, documents }),
        })
    }

    /// Registers a new collection. Fails with `already_exists` when the name
    /// is taken.
    pub fn create_collection(
        &self,
        name: &str,
        description: &str,
        schema: Option<CollectionSchema>,
    ) -> Result<Collection> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if inner.schema.collections.contains_key(name) {
            return Err(Error::AlreadyExists(format!("collection {name}")));
        }

        let mut collection = Collection::new(name, description);
        collection.schema = schema;
        fs::create_dir_all(self.base_path.join(COLLECTIONS_DIR).join(name))?;

        inner.documents.insert(name.to_string(), HashMap::new());
        inner
            .schema
            .collections
            .insert(name.to_string(), collection.clone());
        save_schema(&self.base_path, &mut inner.schema)?;

        tracing::info!(collection = name, "created collection");
        Ok(collection)
    }

    /// Returns the named collection's registry entry.
    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        let inner = self.inner.read();
        inner
            .schema
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("collection {name}")))
    }

    /// Returns all registered collections.
    pub fn list_collections(&self) -> Vec<Collection> {
        let inner = self.inner.read();
        inner.schema.collections.values().cloned().collect()
    }

    /// Stores a document: assigns `created_at` on first write, advances
    /// `updated_at` and `version` on every write, spills large embeddings to
    /// a side file, and updates collection stats.
    pub fn store_document(&self, collection: &str, mut doc: Document) -> Result<Document> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if !inner.schema.collections.contains_key(collection) {
            return Err(Error::NotFound(format!("collection {collection}")));
        }

        if doc.id.is_empty() {
            doc.id = Uuid::new_v4().to_string();
        }
        let now = Utc::now();
        let docs = inner.documents.entry(collection.to_string()).or_default();
        match docs.get(&doc.id) {
            Some(existing) => {
                doc.created_at = existing.created_at;
                doc.version = existing.version + 1;
            }
            None => {
                if doc.created_at == unix_epoch() {
                    doc.created_at = now;
                }
                doc.version = 1;
            }
        }
        doc.updated_at = now;
        doc.collection_id = collection.to_string();

        if let Some(content) = doc.content.as_mut() {
            assign_content_paths(collection, &doc.id, content);
        }
        self.spill_embedding(collection, &doc.id, doc.embedding.as_mut())?;

        write_json_atomic(&self.document_path(collection, &doc.id), &doc)?;

        docs.insert(doc.id.clone(), doc.clone());
        let document_count = docs.len();
        let total_size = collection_size(&self.base_path, collection);
        if let Some(col) = inner.schema.collections.get_mut(collection) {
            col.stats.document_count = document_count;
            col.stats.total_size = total_size;
            col.stats.last_updated = now;
            col.updated_at = now;
        }
        save_schema(&self.base_path, &mut inner.schema)?;

        tracing::debug!(collection, document = %doc.id, version = doc.version, "stored document");
        Ok(doc)
    }

    /// Retrieves a document, loading its side-file embedding on demand.
    /// Falls back to parsing the document file when the in-memory map misses.
    pub fn get_document(&self, collection: &str, doc_id: &str) -> Result<Document> {
        let inner = self.inner.read();
        if !inner.schema.collections.contains_key(collection) {
            return Err(Error::NotFound(format!("collection {collection}")));
        }
        let cached = inner
            .documents
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned();
        drop(inner);

        if let Some(mut doc) = cached {
            self.resolve_embedding(&mut doc);
            return Ok(doc);
        }

        let path = self.document_path(collection, doc_id);
        let raw = fs::read(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFound(format!("document {doc_id}"))
            } else {
                Error::Io(e)
            }
        })?;
        let mut doc: Document = serde_json::from_slice(&raw)
            .map_err(|e| Error::Corrupt(format!("document {doc_id} unreadable: {e}")))?;
        self.resolve_embedding(&mut doc);
        Ok(doc)
    }

    /// Removes a document, its embedding side file, and its content
    /// directory.
    pub fn delete_document(&self, collection: &str, doc_id: &str) -> Result<()> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if !inner.schema.collections.contains_key(collection) {
            return Err(Error::NotFound(format!("collection {collection}")));
        }
        let docs = inner.documents.entry(collection.to_string()).or_default();
        if docs.remove(doc_id).is_none() {
            return Err(Error::NotFound(format!("document {doc_id}")));
        }
        let document_count = docs.len();

        let _ = fs::remove_file(self.document_path(collection, doc_id));
        let _ = fs::remove_file(self.base_path.join(embedding_rel_path(collection, doc_id)));
        let _ = fs::remove_dir_all(
            self.base_path
                .join(CONTENT_DIR)
                .join(collection)
                .join(doc_id),
        );

        let now = Utc::now();
        let total_size = collection_size(&self.base_path, collection);
        if let Some(col) = inner.schema.collections.get_mut(collection) {
            col.stats.document_count = document_count;
            col.stats.total_size = total_size;
            col.stats.last_updated = now;
            col.updated_at = now;
        }
        save_schema(&self.base_path, &mut inner.schema)?;

        tracing::debug!(collection, document = doc_id, "deleted document");
        Ok(())
    }

    /// Linear scan of a collection against the filter grammar, evaluated over
    /// stringified document metadata.
    pub fn query_by_metadata(&self, collection: &str, filters: &Filters) -> Result<Vec<Document>> {
        let inner = self.inner.read();
        if !inner.schema.collections.contains_key(collection) {
            return Err(Error::NotFound(format!("collection {collection}")));
        }
        let mut results = Vec::new();
        if let Some(docs) = inner.documents.get(collection) {
            for doc in docs.values() {
                if filter::matches(&metadata_strings(doc), filters) {
                    results.push(doc.clone());
                }
            }
        }
        Ok(results)
    }

    /// Returns every document in a collection with embeddings resolved.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let inner = self.inner.read();
        if !inner.schema.collections.contains_key(collection) {
            return Err(Error::NotFound(format!("collection {collection}")));
        }
        let mut docs: Vec<Document> = inner
            .documents
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        drop(inner);

        for doc in &mut docs {
            self.resolve_embedding(doc);
        }
        Ok(docs)
    }

    /// Dumps a collection (documents with embeddings inlined) to a JSON file.
    pub fn export(&self, collection: &str, output_path: impl AsRef<Path>) -> Result<()> {
        let col = self.get_collection(collection)?;
        let mut documents = self.list_documents(collection)?;
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        for doc in &mut documents {
            if let Some(embedding) = doc.embedding.as_mut() {
                embedding.path = None;
            }
        }
        write_json_atomic(
            output_path.as_ref(),
            &CollectionExport {
                collection: col,
                documents,
            },
        )?;
        tracing::info!(collection, path = %output_path.as_ref().display(), "exported collection");
        Ok(())
    }

    /// Loads a collection dump under a new name, preserving document ids,
    /// metadata, versions, and timestamps.
    pub fn import(&self, name: &str, input_path: impl AsRef<Path>) -> Result<Collection> {
        let raw = fs::read(input_path.as_ref())?;
        let dump: CollectionExport = serde_json::from_slice(&raw)
            .map_err(|e| Error::Corrupt(format!("export file unreadable: {e}")))?;

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if inner.schema.collections.contains_key(name) {
            return Err(Error::AlreadyExists(format!("collection {name}")));
        }

        let now = Utc::now();
        let mut collection = dump.collection;
        collection.id = name.to_string();
        collection.name = name.to_string();
        collection.updated_at = now;

        let mut docs = HashMap::new();
        for mut doc in dump.documents {
            doc.collection_id = name.to_string();
            self.spill_embedding(name, &doc.id, doc.embedding.as_mut())?;
            write_json_atomic(&self.document_path(name, &doc.id), &doc)?;
            docs.insert(doc.id.clone(), doc);
        }

        collection.stats.document_count = docs.len();
        collection.stats.total_size = collection_size(&self.base_path, name);
        collection.stats.last_updated = now;

        inner.documents.insert(name.to_string(), docs);
        inner
            .schema
            .collections
            .insert(name.to_string(), collection.clone());
        save_schema(&self.base_path, &mut inner.schema)?;

        tracing::info!(collection = name, documents = collection.stats.document_count, "imported collection");
        Ok(collection)
    }

    /// Persists the schema. Call before dropping the store.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.inner.write();
        save_schema(&self.base_path, &mut guard.schema)
    }

    /// Storage-level summary across all collections.
    pub fn stats(&self) -> StorageStats {
        let inner = self.inner.read();
        StorageStats {
            version: inner.schema.version,
            collections: inner.schema.collections.len(),
            total_documents: inner
                .schema
                .collections
                .values()
                .map(|c| c.stats.document_count)
                .sum(),
            created_at: inner.schema.created_at,
            updated_at: inner.schema.updated_at,
        }
    }

    /// Moves an over-threshold embedding into its side file, leaving a path
    /// reference behind. An embedding shrinking back under the threshold
    /// removes the stale side file.
    fn spill_embedding(
        &self,
        collection: &str,
        doc_id: &str,
        embedding: Option<&mut EmbeddingData>,
    ) -> Result<()> {
        let Some(embedding) = embedding else {
            return Ok(());
        };
        if embedding.vector.is_empty() {
            return Ok(());
        }
        let serialized = serde_json::to_vec(&embedding.vector).map_err(json_write_err)?;
        let rel = embedding_rel_path(collection, doc_id);
        if serialized.len() > self.options.embedding_inline_max_bytes {
            write_json_atomic(&self.base_path.join(&rel), embedding)?;
            embedding.vector = Vec::new();
            embedding.path = Some(rel);
        } else {
            let _ = fs::remove_file(self.base_path.join(&rel));
            embedding.path = None;
        }
        Ok(())
    }

    fn resolve_embedding(&self, doc: &mut Document) {
        let Some(embedding) = doc.embedding.as_ref() else {
            return;
        };
        if !embedding.vector.is_empty() {
            return;
        }
        let Some(rel) = embedding.path.clone() else {
            return;
        };
        match fs::read(self.base_path.join(&rel)) {
            Ok(raw) => match serde_json::from_slice::<EmbeddingData>(&raw) {
                Ok(mut loaded) => {
                    loaded.path = Some(rel);
                    doc.embedding = Some(loaded);
                }
                Err(e) => {
                    tracing::warn!(document = %doc.id, error = %e, "embedding side file unreadable")
                }
            },
            Err(e) => {
                tracing::warn!(document = %doc.id, error = %e, "embedding side file unreadable")
            }
        }
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> PathBuf {
        self.base_path
            .join(COLLECTIONS_DIR)
            .join(collection)
            .join(format!("{doc_id}.json"))
    }
}

/// Stringified view of document metadata for the filter evaluator.
pub(crate) fn metadata_strings(doc: &Document) -> HashMap<String, String> {
    doc.metadata
        .iter()
        .map(|(k, v)| (k.clone(), filter::stringify(v)))
        .collect()
}

fn assign_content_paths(collection: &str, doc_id: &str, content: &mut ContentData) {
    if let Some(image) = content.image.as_mut() {
        if image.path.is_empty() {
            image.path = content_rel_path(collection, doc_id, "image");
        }
    }
    if let Some(audio) = content.audio.as_mut() {
        if audio.path.is_empty() {
            audio.path = content_rel_path(collection, doc_id, "audio");
        }
    }
    if let Some(video) = content.video.as_mut() {
        if video.path.is_empty() {
            video.path = content_rel_path(collection, doc_id, "video");
        }
    }
    if let Some(binary) = content.binary.as_mut() {
        if binary.path.is_empty() {
            binary.path = content_rel_path(collection, doc_id, "binary");
        }
    }
}

fn embedding_rel_path(collection: &str, doc_id: &str) -> String {
    format!("{EMBEDDINGS_DIR}/{collection}/{doc_id}.json")
}

fn content_rel_path(collection: &str, doc_id: &str, kind: &str) -> String {
    format!("{CONTENT_DIR}/{collection}/{doc_id}/{kind}")
}

fn save_schema(base_path: &Path, schema: &mut StorageSchema) -> Result<()> {
    schema.updated_at = Utc::now();
    write_json_atomic(&base_path.join(METADATA_FILE), schema)
}

/// Atomic JSON write: temp file in the target directory, then rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(value).map_err(json_write_err)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn json_write_err(e: serde_json::Error) -> Error {
    Error::Io(io::Error::other(e))
}

fn load_documents(base_path: &Path, collection: &str) -> HashMap<String, Document> {
    let mut docs = HashMap::new();
    let dir = base_path.join(COLLECTIONS_DIR).join(collection);
    let Ok(entries) = fs::read_dir(&dir) else {
        return docs;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match fs::read(&path).map_err(Error::Io).and_then(|raw| {
            serde_json::from_slice::<Document>(&raw)
                .map_err(|e| Error::Corrupt(e.to_string()))
        }) {
            Ok(doc) => {
                docs.insert(doc.id.clone(), doc);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document file");
            }
        }
    }
    tracing::debug!(collection, documents = docs.len(), "loaded collection documents");
    docs
}

fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

fn collection_size(base_path: &Path, collection: &str) -> u64 {
    dir_size(&base_path.join(COLLECTIONS_DIR).join(collection))
        + dir_size(&base_path.join(EMBEDDINGS_DIR).join(collection))
        + dir_size(&base_path.join(CONTENT_DIR).join(collection))
}
