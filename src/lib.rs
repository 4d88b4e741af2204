//! # vicinity
//!
//! An embeddable in-process vector database with exact nearest-neighbor
//! search, composable metadata filtering, hybrid score fusion, and temporal
//! decay reweighting.
//!
//! ## Features
//!
//! - **Exact vector search** over 64-bit float embeddings with cosine scoring
//!   and deterministic ranking (score descending, ties broken by id)
//! - **Metadata filtering** with a structured operator grammar (`eq`, `neq`,
//!   `lt`, `lte`, `gt`, `gte`, `between`, `contains`, `in`, `exists`)
//! - **Hybrid search** fusing vector similarity with a metadata-match score
//!   via convex weighting
//! - **Temporal search** applying exponential time decay against a
//!   configurable reference time and timestamp field
//! - **Pluggable storage** behind one contract: a concurrent in-memory store
//!   and a schema-driven persistent store with split document/embedding/content
//!   files
//! - **Streaming ingestion** from a source contract through an embedder into
//!   batched storage writes, with per-record failure accounting
//!
//! ## Architecture
//!
//! ```text
//! Source → Embedder → Ingestor → VectorStore ← Query engine
//!                                    │
//!                     MemoryStore ───┴─── LocalVectorStore
//!                                          (metadata.json + collections/
//!                                           + embeddings/ + content/)
//! ```
//!
//! This is the core library crate with zero async dependencies — transports,
//! CLI wiring, and concrete embedding providers live outside and talk to the
//! core through the [`storage::VectorStore`], [`embedder::Embedder`], and
//! [`ingest::Source`] contracts.

/// Global configuration constants: defaults, limits, and tuning parameters.
pub mod config;
/// Embedder contracts consumed by the ingestion pipeline and query engine.
pub mod embedder;
/// Error type covering every failure kind surfaced by the crate.
pub mod error;
/// Metadata filter grammar and evaluator.
pub mod filter;
/// Streaming ingestion: source contract, pipeline, and accounting.
pub mod ingest;
/// Core record type: identity, embedding, metadata, and distance primitives.
pub mod record;
/// Search primitives: request shapes, scoring, temporal decay, and the shared
/// query pipeline.
pub mod search;
/// Storage layer: the store contract, in-memory and persistent backends, the
/// env-driven facade, and the migration helper.
pub mod storage;

pub use error::{Error, Result};
pub use record::Record;
pub use search::engine::{CancelToken, QueryContext};
pub use search::types::{
    AdvancedSearchRequest, HybridWeight, SearchOptions, SearchRequest, SearchResult,
    TemporalSearchRequest, TemporalSearchResult,
};
pub use storage::local::{LocalStorage, LocalStoreOptions, LocalVectorStore};
pub use storage::memory::MemoryStore;
pub use storage::{open_store, StorageBackend, StorageConfig, VectorStore};
