//! On-disk schema and document model for the persistent store.
//!
//! `metadata.json` serializes a [`StorageSchema`]: the numeric format
//! version, storage-level metadata, and the collection registry. Documents
//! are not part of the schema file; each lives in its own JSON file under
//! `collections/<name>/`.

use crate::record::unix_epoch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Top-level storage structure persisted as `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSchema {
    /// On-disk format version; incompatible versions are rejected at open.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: StorageMetadata,
    #[serde(default)]
    pub collections: HashMap<String, Collection>,
}

/// Storage-level descriptive metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, String>,
}

/// A named container of documents governed by an optional schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<CollectionSchema>,
    #[serde(default)]
    pub stats: CollectionStats,
}

impl Collection {
    /// Creates a collection with fresh timestamps and empty stats.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: name.clone(),
            name,
            description: description.into(),
            created_at: now,
            updated_at: now,
            schema: None,
            stats: CollectionStats {
                last_updated: now,
                ..Default::default()
            },
        }
    }
}

/// Structure and constraints for documents in a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSchema {
    #[serde(default)]
    pub fields: HashMap<String, FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_config: Option<VectorConfig>,
}

/// Declared type and constraints of one metadata field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl FieldDefinition {
    /// An indexed field of the given type with no further constraints.
    pub fn indexed(field_type: FieldType) -> Self {
        Self {
            field_type,
            indexed: true,
            unique: false,
            enum_values: None,
        }
    }

    /// An unindexed field of the given type.
    pub fn plain(field_type: FieldType) -> Self {
        Self {
            field_type,
            indexed: false,
            unique: false,
            enum_values: None,
        }
    }
}

/// Declared metadata field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Vector embedding configuration for a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    pub dimension: usize,
    pub embedder_type: String,
    pub metric: Metric,
}

/// Similarity metric declared for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    Dot,
}

/// Collection statistics maintained on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub document_count: usize,
    pub total_size: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for CollectionStats {
    fn default() -> Self {
        Self {
            document_count: 0,
            total_size: 0,
            last_updated: unix_epoch(),
        }
    }
}

/// A stored document: the persistent-store superset of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub collection_id: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "unix_epoch")]
    pub updated_at: DateTime<Utc>,
    /// Monotone version, starting at 1 and incremented on each store.
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<EmbeddingData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Document {
    /// Creates a document with unset timestamps; the store assigns them on
    /// first write.
    pub fn new(id: impl Into<String>, doc_type: DocumentType) -> Self {
        Self {
            id: id.into(),
            collection_id: String::new(),
            doc_type,
            created_at: unix_epoch(),
            updated_at: unix_epoch(),
            version: 0,
            metadata: HashMap::new(),
            content: None,
            embedding: None,
            relations: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// Kind of content a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Custom,
}

/// Typed payload descriptors. Large binary payloads are referenced by path
/// under the `content/` directory rather than inlined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentData {
    #[serde(rename = "type")]
    pub content_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<BinaryContent>,
}

impl ContentData {
    /// Plain text content.
    pub fn text(raw: impl Into<String>) -> Self {
        Self {
            content_type: DocumentType::Text,
            text: Some(TextContent {
                raw: raw.into(),
                language: String::new(),
                format: "plain".to_string(),
            }),
            image: None,
            audio: None,
            video: None,
            binary: None,
        }
    }
}

/// Inline text payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub raw: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
}

/// Image payload descriptor referencing a file under `content/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// Audio payload descriptor referencing a file under `content/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioContent {
    pub format: String,
    pub duration: f64,
    pub sample_rate: u32,
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// Video payload descriptor referencing a file under `content/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoContent {
    pub format: String,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

/// Arbitrary binary payload descriptor referencing a file under `content/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryContent {
    pub format: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checksum: String,
}

/// Embedding payload: stored inline in the document while small, moved to a
/// side file under `embeddings/` past the inlining threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f64>,
    pub dimension: usize,
    pub model: String,
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    /// Base-relative path of the side file holding the vector, when the
    /// embedding was too large to inline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A typed link to another document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub relation_type: String,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}
