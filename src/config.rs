//! Global configuration constants for vicinity.
//!
//! Defaults and tuning parameters are defined here; runtime selection of the
//! storage backend is handled by [`StorageConfig::from_env`](crate::storage::StorageConfig::from_env).

/// Number of results returned when a request omits `top_k` or sets it to 0.
pub const DEFAULT_TOP_K: usize = 10;

/// Seconds in a Julian year, used to express document age in years for decay.
pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Decay rate for `strong` temporal decay (~61% score retained after 1 year).
pub const DECAY_LAMBDA_STRONG: f64 = 0.5;

/// Decay rate for `medium` temporal decay (~90% score retained after 1 year).
pub const DECAY_LAMBDA_MEDIUM: f64 = 0.1;

/// Decay rate for `weak` temporal decay (~99% score retained after 1 year).
pub const DECAY_LAMBDA_WEAK: f64 = 0.01;

/// Metadata field consulted for document timestamps when a temporal request
/// does not name one.
pub const DEFAULT_TIME_FIELD: &str = "created_at";

/// Records buffered by the ingestion pipeline before a batch flush.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Maximum serialized size (bytes) of an embedding kept inline in a document
/// file; larger embeddings are written to a side file under `embeddings/`.
pub const EMBEDDING_INLINE_MAX_BYTES: usize = 4096;

/// On-disk schema version written to `metadata.json`. Any other version is
/// rejected at open.
pub const SCHEMA_VERSION: u32 = 1;

/// Default base path for the persistent store.
pub const DEFAULT_DATA_DIR: &str = "./data/storage";

/// Default collection name used by the persistent store adapter.
pub const DEFAULT_COLLECTION: &str = "default";

/// Default embedding dimension recorded in a bootstrapped collection schema.
pub const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Environment variable selecting the storage backend (`memory` or `local`).
pub const ENV_STORAGE_TYPE: &str = "VICINITY_STORAGE";

/// Environment variable overriding the persistent store base path.
pub const ENV_DATA_DIR: &str = "VICINITY_DATA_DIR";

/// Environment variable overriding the persistent store collection name.
pub const ENV_COLLECTION: &str = "VICINITY_COLLECTION";
