//! Error type covering every failure kind surfaced by the crate.
//!
//! Each variant corresponds to one failure kind of the storage, embedder, and
//! ingestion contracts. [`Error::kind`] exposes the kind as a stable string
//! identifier for transports that report failures over the wire.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds of the storage, query, embedder, and ingestion surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data violates a static invariant (empty embedding,
    /// empty query, weights out of range).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The named record or collection does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Collection creation conflicts with an existing name.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// An underlying file or lock operation failed.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk schema or document data is unreadable.
    #[error("storage corrupt: {0}")]
    Corrupt(String),

    /// A storage operation exceeded its deadline while holding a lock. The
    /// caller may retry idempotently on the same id.
    #[error("storage timeout: {0}")]
    Timeout(String),

    /// An upstream embedding call failed.
    #[error("embedder error: {0}")]
    Embedder(String),

    /// An image record was handed to an embedder without image support.
    #[error("embedder does not support image input")]
    NotMultimodal,

    /// An ingestion source failed to open.
    #[error("failed to open source: {0}")]
    SourceOpen(String),

    /// A transient read error from an ingestion source. The pipeline recovers
    /// these locally and tallies them.
    #[error("source read error: {0}")]
    SourceRead(String),

    /// A query exceeded its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The operation was cancelled cooperatively.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Stable kind identifier for this error, suitable for wire protocols.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::Io(_) => "storage_io",
            Error::Corrupt(_) => "storage_corrupt",
            Error::Timeout(_) => "storage_timeout",
            Error::Embedder(_) => "embedder_error",
            Error::NotMultimodal => "embedder_not_multimodal",
            Error::SourceOpen(_) => "source_open",
            Error::SourceRead(_) => "read_error",
            Error::DeadlineExceeded => "deadline_exceeded",
            Error::Cancelled => "cancelled",
        }
    }

    /// True when the error indicates a missing record or collection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
