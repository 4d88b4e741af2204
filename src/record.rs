//! Core record type for vicinity.
//!
//! A [`Record`] is the unit of storage and retrieval: an opaque string id, a
//! 64-bit float embedding, arbitrary string metadata, and creation/update
//! timestamps. Distance primitives operate on raw embedding slices so both
//! records and query vectors share them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Serde default for record timestamps. The epoch doubles as the "unset"
/// sentinel consulted by the temporal scorer's fallback chain.
pub(crate) fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// A stored vector record with id, embedding, metadata, and timestamps.
///
/// Metadata values are always stored as strings; numeric filter comparisons
/// parse on demand. Stored records are treated as immutable by readers — an
/// update through [`store`](crate::storage::VectorStore::store) replaces the
/// record atomically rather than mutating it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, assigned on validation when absent.
    #[serde(default)]
    pub id: String,
    /// Embedding vector. Never mutated in place after store.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f64>,
    /// Arbitrary key-value metadata used for filtering.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    /// Set by the store on first write, preserved on re-store.
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    /// Advanced by the store on every write.
    #[serde(default = "unix_epoch")]
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record with the given id and embedding and wall-clock
    /// timestamps.
    pub fn new(id: impl Into<String>, embedding: Vec<f64>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            embedding,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a record with metadata attached.
    pub fn with_metadata(
        id: impl Into<String>,
        embedding: Vec<f64>,
        metadata: HashMap<String, String>,
    ) -> Self {
        let mut record = Self::new(id, embedding);
        record.metadata = metadata;
        record
    }

    /// Validates the record for storage: the embedding must be non-empty, and
    /// a missing id is assigned a fresh UUID.
    pub fn validate(&mut self) -> crate::Result<()> {
        if self.embedding.is_empty() {
            return Err(crate::Error::InvalidRequest(
                "embedding cannot be empty".into(),
            ));
        }
        if self.id.is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        Ok(())
    }

    /// Cosine similarity against another record. See [`cosine`].
    pub fn cosine_similarity(&self, other: &Record) -> f64 {
        cosine(&self.embedding, &other.embedding)
    }

    /// Euclidean distance against another record. See [`euclidean`].
    pub fn euclidean_distance(&self, other: &Record) -> f64 {
        euclidean(&self.embedding, &other.embedding)
    }
}

/// Cosine similarity of two vectors, in [-1, 1].
///
/// Returns 0 when the dimensions differ or either norm is zero, so the search
/// loop stays branchless and heterogeneous shapes can coexist during model
/// migration.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Euclidean distance of two vectors, or +∞ when the dimensions differ.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    let mut sum = 0.0;
    for i in 0..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_embedding() {
        let mut record = Record::new("r1", vec![]);
        let err = record.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn test_validate_assigns_missing_id() {
        let mut record = Record::new("", vec![1.0, 2.0]);
        record.validate().unwrap();
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_validate_keeps_existing_id() {
        let mut record = Record::new("keep-me", vec![1.0]);
        record.validate().unwrap();
        assert_eq!(record.id, "keep-me");
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.3, 0.5, 0.2];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_opposite() {
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_dimension_mismatch_is_zero() {
        assert_eq!(cosine(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_euclidean_basic() {
        assert!((euclidean(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_dimension_mismatch_is_infinite() {
        assert!(euclidean(&[1.0], &[1.0, 2.0]).is_infinite());
    }

    #[test]
    fn test_record_distance_methods() {
        let a = Record::new("a", vec![1.0, 0.0]);
        let b = Record::new("b", vec![0.0, 1.0]);
        assert_eq!(a.cosine_similarity(&b), 0.0);
        assert!((a.euclidean_distance(&b) - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_serde_roundtrip_skips_empty_fields() {
        let record = Record::new("r1", vec![1.0, 2.0]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("metadata"));
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
