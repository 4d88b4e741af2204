//! Schema-driven persistent store.
//!
//! On-disk layout under a configured base path:
//!
//! ```text
//! metadata.json                       top-level schema and collection registry
//! collections/<collection>/<id>.json  one document per record, no embedding
//! embeddings/<collection>/<id>.json   embedding vector + dimension + model tag
//! content/<collection>/<id>/<kind>    large binary payloads
//! ```
//!
//! Document files stay small (no vectors) so metadata scans remain in the OS
//! page cache; embeddings and binary content load only when a candidate
//! survives filtering.

/// Document ⇄ record adapter implementing the storage contract over one
/// collection.
pub mod adapter;
/// On-disk schema and document model.
pub mod schema;
/// The persistent store itself.
pub mod store;

pub use adapter::LocalVectorStore;
pub use schema::{
    Collection, CollectionSchema, CollectionStats, ContentData, Document, DocumentType,
    EmbeddingData, FieldDefinition, FieldType, Metric, Relation, StorageMetadata, StorageSchema,
    TextContent, VectorConfig,
};
pub use store::{LocalStorage, LocalStoreOptions, StorageStats};
