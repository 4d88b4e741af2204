//! Request and result shapes for the three query variants.
//!
//! Requests deserialize from the external wire format and carry their own
//! validation: `top_k` defaults to 10 when absent or zero, hybrid weights
//! must each lie in [0, 1] and sum to exactly 1.0, and empty query inputs are
//! rejected before they reach a store.

use crate::config;
use crate::error::{Error, Result};
use crate::filter::Filters;
use crate::record::Record;
use crate::search::temporal::{DecayStrength, TemporalConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record with its relevance score from a search query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Snapshot copy of the matched record.
    pub record: Record,
    /// Final score: cosine similarity, optionally hybrid-reweighted.
    pub score: f64,
}

/// A temporal search result carrying both the raw and decayed scores.
#[derive(Debug, Clone, Serialize)]
pub struct TemporalSearchResult {
    /// Snapshot copy of the matched record.
    pub record: Record,
    /// Final score with decay applied.
    pub score: f64,
    /// Cosine similarity before decay.
    pub base_score: f64,
    /// Temporal decay factor applied to the base score.
    pub decay_factor: f64,
    /// Timestamp used for decay.
    pub document_time: DateTime<Utc>,
    /// Human-readable age relative to the reference time.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub age: String,
}

/// Hybrid weighting between vector similarity and metadata match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeight {
    /// Weight of the cosine similarity score, in [0, 1].
    pub vector: f64,
    /// Weight of the binary metadata-match score, in [0, 1].
    pub metadata: f64,
}

/// Optional search behavior toggles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// When present, fuses vector and metadata scores per the weights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid_weight: Option<HybridWeight>,
}

/// Plain vector search: a query embedding, result limit, and filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Query embedding. Must be non-empty.
    #[serde(default)]
    pub embedding: Vec<f64>,
    /// Maximum results to return; defaults to 10 when 0.
    #[serde(default)]
    pub top_k: usize,
    /// Conjunctive metadata filters.
    #[serde(default)]
    pub filters: Filters,
    /// When false, embeddings are cleared on the returned copies.
    #[serde(default)]
    pub return_embedding: bool,
}

impl SearchRequest {
    /// Validates the request, applying the `top_k` default.
    pub fn validate(&mut self) -> Result<()> {
        if self.embedding.is_empty() {
            return Err(Error::InvalidRequest("embedding cannot be empty".into()));
        }
        if self.top_k == 0 {
            self.top_k = config::DEFAULT_TOP_K;
        }
        Ok(())
    }
}

/// Text-driven search with metadata filters and optional hybrid weighting.
/// The query text is embedded by the bound embedder before scoring.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvancedSearchRequest {
    /// Query text. Must be non-empty.
    #[serde(default)]
    pub query: String,
    /// Maximum results to return; defaults to 10 when 0.
    #[serde(default)]
    pub top_k: usize,
    /// Conjunctive metadata filters.
    #[serde(default)]
    pub filters: Filters,
    /// Hybrid weighting and other options.
    #[serde(default)]
    pub options: Option<SearchOptions>,
    /// When false, embeddings are cleared on the returned copies.
    #[serde(default)]
    pub return_embedding: bool,
}

impl AdvancedSearchRequest {
    /// Validates the request: non-empty query, `top_k` default, and hybrid
    /// weights each in [0, 1] summing to exactly 1.0.
    pub fn validate(&mut self) -> Result<()> {
        if self.query.is_empty() {
            return Err(Error::InvalidRequest("query cannot be empty".into()));
        }
        if self.top_k == 0 {
            self.top_k = config::DEFAULT_TOP_K;
        }
        validate_hybrid_weight(self.hybrid_weight())
    }

    /// The hybrid weights carried by this request, if any.
    pub fn hybrid_weight(&self) -> Option<HybridWeight> {
        self.options.as_ref().and_then(|o| o.hybrid_weight)
    }
}

/// Temporal search: advanced search plus exponential time decay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemporalSearchRequest {
    /// Query text. Must be non-empty.
    #[serde(default)]
    pub query: String,
    /// Maximum results to return; defaults to 10 when 0.
    #[serde(default)]
    pub top_k: usize,
    /// Conjunctive metadata filters.
    #[serde(default)]
    pub filters: Filters,
    /// Decay strength; defaults to `none`.
    #[serde(default)]
    pub temporal_decay: DecayStrength,
    /// Time to compute document ages from; defaults to now.
    #[serde(default)]
    pub reference_time: Option<DateTime<Utc>>,
    /// Metadata field holding the document timestamp; defaults to
    /// `created_at`.
    #[serde(default)]
    pub time_field: String,
    /// Hybrid weighting and other options.
    #[serde(default)]
    pub options: Option<SearchOptions>,
    /// When false, embeddings are cleared on the returned copies.
    #[serde(default)]
    pub return_embedding: bool,
}

impl TemporalSearchRequest {
    /// Validates the request, applying the `top_k`, decay, and time-field
    /// defaults.
    pub fn validate(&mut self) -> Result<()> {
        if self.query.is_empty() {
            return Err(Error::InvalidRequest("query cannot be empty".into()));
        }
        if self.top_k == 0 {
            self.top_k = config::DEFAULT_TOP_K;
        }
        if self.time_field.is_empty() {
            self.time_field = config::DEFAULT_TIME_FIELD.to_string();
        }
        validate_hybrid_weight(self.hybrid_weight())
    }

    /// The hybrid weights carried by this request, if any.
    pub fn hybrid_weight(&self) -> Option<HybridWeight> {
        self.options.as_ref().and_then(|o| o.hybrid_weight)
    }

    /// Resolves this request into a temporal scoring configuration.
    pub fn temporal_config(&self) -> TemporalConfig {
        TemporalConfig {
            lambda: self.temporal_decay.lambda(),
            reference_time: self.reference_time.unwrap_or_else(Utc::now),
            time_field: if self.time_field.is_empty() {
                config::DEFAULT_TIME_FIELD.to_string()
            } else {
                self.time_field.clone()
            },
        }
    }
}

fn validate_hybrid_weight(weight: Option<HybridWeight>) -> Result<()> {
    let Some(hw) = weight else {
        return Ok(());
    };
    if !(0.0..=1.0).contains(&hw.vector) || !(0.0..=1.0).contains(&hw.metadata) {
        return Err(Error::InvalidRequest(
            "hybrid weights must be between 0 and 1".into(),
        ));
    }
    if hw.vector + hw.metadata != 1.0 {
        return Err(Error::InvalidRequest(
            "hybrid weights must sum to 1.0".into(),
        ));
    }
    Ok(())
}
