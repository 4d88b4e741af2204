//! Shared query pipeline for the three search variants.
//!
//! Each variant walks the same stages over a candidate snapshot: skip
//! candidates whose embedding dimension differs from the query, evaluate the
//! filter predicate, score, rank, truncate. Ranking is deterministic: final
//! score descending, ties broken by ascending id. Per-candidate anomalies are
//! silently skipped; only request-level validation errors surface.
//!
//! Cancellation is cooperative: a [`QueryContext`] carries a request-scoped
//! [`CancelToken`] and optional deadline, checked before the sort phase.

use crate::config;
use crate::error::{Error, Result};
use crate::filter;
use crate::record::{cosine, Record};
use crate::search::temporal::{format_age, TemporalScorer};
use crate::search::types::{
    AdvancedSearchRequest, SearchRequest, SearchResult, TemporalSearchRequest,
    TemporalSearchResult,
};
use ordered_float::OrderedFloat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A shared flag for cooperative cancellation. Cloning yields a handle to the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation on every handle of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](CancelToken::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Request-scoped execution context handed to the search variants by the
/// transport layer. The default context never cancels.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    /// Cooperative cancellation token.
    pub cancel: CancelToken,
    /// Absolute deadline for the query.
    pub deadline: Option<Instant>,
}

impl QueryContext {
    /// A context that expires at the given instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancelToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Fails with `cancelled` or `deadline_exceeded` when the context has
    /// expired.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

/// Plain vector search: filters gate, cosine scores, deterministic top-K.
///
/// The request must have been validated; candidates whose dimension differs
/// from the query embedding are skipped silently.
pub fn vector_search<'a, I>(
    candidates: I,
    req: &SearchRequest,
    ctx: &QueryContext,
) -> Result<Vec<SearchResult>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut results = Vec::new();
    let mut skipped_dimension = 0usize;

    for record in candidates {
        if record.embedding.len() != req.embedding.len() {
            skipped_dimension += 1;
            continue;
        }
        if !filter::matches(&record.metadata, &req.filters) {
            continue;
        }
        let score = cosine(&req.embedding, &record.embedding);
        results.push(SearchResult {
            record: snapshot(record, req.return_embedding),
            score,
        });
    }

    tracing::debug!(
        matched = results.len(),
        skipped_dimension,
        "vector search scan complete"
    );
    finish(&mut results, req.top_k, ctx)?;
    Ok(results)
}

/// Advanced search over a pre-computed query embedding, with optional hybrid
/// reweighting.
///
/// When the request carries hybrid weights with a positive metadata share,
/// the filter becomes a scoring signal rather than a gate: non-matching
/// candidates stay in the ranking with a metadata score of 0. With no hybrid
/// weights (or a pure-vector weighting) the filter gates as usual.
pub fn advanced_search<'a, I>(
    candidates: I,
    req: &AdvancedSearchRequest,
    query_embedding: &[f64],
    ctx: &QueryContext,
) -> Result<Vec<SearchResult>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let soft_weight = req.hybrid_weight().filter(|hw| hw.metadata > 0.0);
    let mut results = Vec::new();
    let mut skipped_dimension = 0usize;

    for record in candidates {
        if record.embedding.len() != query_embedding.len() {
            skipped_dimension += 1;
            continue;
        }
        let matched = filter::matches(&record.metadata, &req.filters);
        let score = match soft_weight {
            Some(hw) => {
                let vector_score = cosine(query_embedding, &record.embedding);
                let metadata_score = if matched { 1.0 } else { 0.0 };
                hw.vector * vector_score + hw.metadata * metadata_score
            }
            None => {
                if !matched {
                    continue;
                }
                cosine(query_embedding, &record.embedding)
            }
        };
        results.push(SearchResult {
            record: snapshot(record, req.return_embedding),
            score,
        });
    }

    tracing::debug!(
        matched = results.len(),
        skipped_dimension,
        hybrid = soft_weight.is_some(),
        "advanced search scan complete"
    );
    finish(&mut results, req.top_k, ctx)?;
    Ok(results)
}

/// Temporal search: advanced-search scoring multiplied by an exponential
/// decay factor, reporting both the raw and decayed scores.
pub fn temporal_search<'a, I>(
    candidates: I,
    req: &TemporalSearchRequest,
    query_embedding: &[f64],
    ctx: &QueryContext,
) -> Result<Vec<TemporalSearchResult>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let scorer = TemporalScorer::new(req.temporal_config());
    let soft_weight = req.hybrid_weight().filter(|hw| hw.metadata > 0.0);
    let mut results = Vec::new();
    let mut skipped_dimension = 0usize;

    for record in candidates {
        if record.embedding.len() != query_embedding.len() {
            skipped_dimension += 1;
            continue;
        }
        let matched = filter::matches(&record.metadata, &req.filters);
        let base_score = cosine(query_embedding, &record.embedding);
        let fused = match soft_weight {
            Some(hw) => {
                let metadata_score = if matched { 1.0 } else { 0.0 };
                hw.vector * base_score + hw.metadata * metadata_score
            }
            None => {
                if !matched {
                    continue;
                }
                base_score
            }
        };

        let document_time = scorer.document_time(record);
        let decay_factor = scorer.decay_factor(document_time);
        results.push(TemporalSearchResult {
            record: snapshot(record, req.return_embedding),
            score: fused * decay_factor,
            base_score,
            decay_factor,
            document_time,
            age: format_age(document_time, scorer.reference_time()),
        });
    }

    tracing::debug!(
        matched = results.len(),
        skipped_dimension,
        lambda = req.temporal_decay.lambda(),
        "temporal search scan complete"
    );
    finish(&mut results, req.top_k, ctx)?;
    Ok(results)
}

/// Copies a candidate into a result, clearing the embedding unless the caller
/// asked for it. Stored records are never touched.
fn snapshot(record: &Record, keep_embedding: bool) -> Record {
    let mut copy = record.clone();
    if !keep_embedding {
        copy.embedding = Vec::new();
    }
    copy
}

trait Ranked {
    fn score(&self) -> f64;
    fn id(&self) -> &str;
}

impl Ranked for SearchResult {
    fn score(&self) -> f64 {
        self.score
    }

    fn id(&self) -> &str {
        &self.record.id
    }
}

impl Ranked for TemporalSearchResult {
    fn score(&self) -> f64 {
        self.score
    }

    fn id(&self) -> &str {
        &self.record.id
    }
}

/// Rank (score descending, ties by ascending id) and truncate to `top_k`.
/// Checks the context before sorting.
fn finish<T: Ranked>(results: &mut Vec<T>, top_k: usize, ctx: &QueryContext) -> Result<()> {
    ctx.check()?;
    results.sort_unstable_by(|a, b| {
        OrderedFloat(b.score())
            .cmp(&OrderedFloat(a.score()))
            .then_with(|| a.id().cmp(b.id()))
    });
    let k = if top_k == 0 {
        config::DEFAULT_TOP_K
    } else {
        top_k
    };
    results.truncate(k);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::temporal::DecayStrength;
    use crate::search::types::{HybridWeight, SearchOptions};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn record(id: &str, embedding: Vec<f64>) -> Record {
        Record::new(id, embedding)
    }

    fn tagged(id: &str, embedding: Vec<f64>, key: &str, value: &str) -> Record {
        let mut r = Record::new(id, embedding);
        r.metadata.insert(key.to_string(), value.to_string());
        r
    }

    fn eq_filter(field: &str, value: &str) -> crate::filter::Filters {
        let mut expr = crate::filter::FilterExpr::new();
        expr.insert("eq".to_string(), json!(value));
        let mut filters = crate::filter::Filters::new();
        filters.insert(field.to_string(), expr);
        filters
    }

    fn search_req(embedding: Vec<f64>, top_k: usize) -> SearchRequest {
        let mut req = SearchRequest {
            embedding,
            top_k,
            ..Default::default()
        };
        req.validate().unwrap();
        req
    }

    #[test]
    fn test_dimension_mismatch_skipped_and_ties_deterministic() {
        let records = vec![
            record("a", vec![1.0, 0.0, 0.0]),
            record("b", vec![0.0, 1.0, 0.0]),
            record("c", vec![0.0, 0.0, 1.0]),
            record("d", vec![1.0, 0.0]),
        ];
        let req = search_req(vec![1.0, 0.0, 0.0], 2);
        let results =
            vector_search(records.iter(), &req, &QueryContext::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-12);
        assert_eq!(results[1].record.id, "b");
        assert_eq!(results[1].score, 0.0);
    }

    #[test]
    fn test_empty_candidates_yield_empty_result() {
        let req = search_req(vec![1.0], 5);
        let results =
            vector_search(std::iter::empty(), &req, &QueryContext::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_top_k_larger_than_matches_returns_all() {
        let records = vec![record("a", vec![1.0]), record("b", vec![0.5])];
        let req = search_req(vec![1.0], 100);
        let results =
            vector_search(records.iter(), &req, &QueryContext::default()).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_filters_gate_results() {
        let records = vec![
            tagged("a", vec![1.0, 0.0], "lang", "en"),
            tagged("b", vec![1.0, 0.0], "lang", "it"),
        ];
        let mut req = search_req(vec![1.0, 0.0], 10);
        req.filters = eq_filter("lang", "en");
        let results =
            vector_search(records.iter(), &req, &QueryContext::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "a");
    }

    #[test]
    fn test_embeddings_stripped_unless_requested() {
        let records = vec![record("a", vec![1.0, 0.0])];
        let req = search_req(vec![1.0, 0.0], 10);
        let results =
            vector_search(records.iter(), &req, &QueryContext::default()).unwrap();
        assert!(results[0].record.embedding.is_empty());
        // Stored candidate is untouched.
        assert_eq!(records[0].embedding, vec![1.0, 0.0]);

        let mut req = search_req(vec![1.0, 0.0], 10);
        req.return_embedding = true;
        let results =
            vector_search(records.iter(), &req, &QueryContext::default()).unwrap();
        assert_eq!(results[0].record.embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn test_cancelled_context_fails_before_sort() {
        let records = vec![record("a", vec![1.0])];
        let req = search_req(vec![1.0], 10);
        let ctx = QueryContext::default();
        ctx.cancel.cancel();
        let err = vector_search(records.iter(), &req, &ctx).unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn test_expired_deadline_fails() {
        let records = vec![record("a", vec![1.0])];
        let req = search_req(vec![1.0], 10);
        let ctx = QueryContext::with_deadline(Instant::now() - std::time::Duration::from_secs(1));
        let err = vector_search(records.iter(), &req, &ctx).unwrap_err();
        assert_eq!(err.kind(), "deadline_exceeded");
    }

    fn advanced_req(
        filters: crate::filter::Filters,
        weight: Option<HybridWeight>,
    ) -> AdvancedSearchRequest {
        let mut req = AdvancedSearchRequest {
            query: "q".into(),
            filters,
            options: weight.map(|hybrid| SearchOptions {
                hybrid_weight: Some(hybrid),
            }),
            ..Default::default()
        };
        req.validate().unwrap();
        req
    }

    #[test]
    fn test_hybrid_reweighting_keeps_non_matching_candidates() {
        // Identical cosine 0.8; one matches the filter, one does not.
        let records = vec![
            tagged("match", vec![0.8, 0.6], "lang", "en"),
            tagged("other", vec![0.8, 0.6], "lang", "it"),
        ];
        let req = advanced_req(
            eq_filter("lang", "en"),
            Some(HybridWeight {
                vector: 0.5,
                metadata: 0.5,
            }),
        );
        let query = vec![1.0, 0.0];
        let results =
            advanced_search(records.iter(), &req, &query, &QueryContext::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "match");
        assert!((results[0].score - 0.9).abs() < 1e-9, "{}", results[0].score);
        assert_eq!(results[1].record.id, "other");
        assert!((results[1].score - 0.4).abs() < 1e-9, "{}", results[1].score);
    }

    #[test]
    fn test_pure_vector_weighting_matches_plain_filtered_search() {
        let records = vec![
            tagged("a", vec![1.0, 0.0], "lang", "en"),
            tagged("b", vec![0.8, 0.6], "lang", "en"),
            tagged("c", vec![0.8, 0.6], "lang", "it"),
        ];
        let query = vec![1.0, 0.0];
        let hybrid = advanced_req(
            eq_filter("lang", "en"),
            Some(HybridWeight {
                vector: 1.0,
                metadata: 0.0,
            }),
        );
        let plain = advanced_req(eq_filter("lang", "en"), None);

        let ctx = QueryContext::default();
        let hybrid_results = advanced_search(records.iter(), &hybrid, &query, &ctx).unwrap();
        let plain_results = advanced_search(records.iter(), &plain, &query, &ctx).unwrap();

        assert_eq!(hybrid_results.len(), plain_results.len());
        for (h, p) in hybrid_results.iter().zip(plain_results.iter()) {
            assert_eq!(h.record.id, p.record.id);
            assert_eq!(h.score, p.score);
        }
    }

    fn temporal_req(decay: DecayStrength, reference: chrono::DateTime<Utc>) -> TemporalSearchRequest {
        let mut req = TemporalSearchRequest {
            query: "q".into(),
            temporal_decay: decay,
            reference_time: Some(reference),
            ..Default::default()
        };
        req.validate().unwrap();
        req
    }

    #[test]
    fn test_temporal_strong_decay_reranks_old_documents() {
        let reference = Utc::now();
        let mut recent = record("recent", vec![0.8, 0.6]);
        recent.created_at = reference - Duration::seconds(crate::config::SECONDS_PER_YEAR as i64);
        let mut old = record("old", vec![0.8, 0.6]);
        old.created_at = reference - Duration::seconds((5.0 * crate::config::SECONDS_PER_YEAR) as i64);

        let records = vec![old, recent];
        let req = temporal_req(DecayStrength::Strong, reference);
        let query = vec![1.0, 0.0];
        let results =
            temporal_search(records.iter(), &req, &query, &QueryContext::default()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, "recent");
        assert!((results[0].decay_factor - 0.6065).abs() < 1e-3);
        assert!((results[0].score - 0.8 * 0.6065).abs() < 1e-3);
        assert!((results[0].base_score - 0.8).abs() < 1e-9);
        assert_eq!(results[1].record.id, "old");
        assert!((results[1].decay_factor - 0.0821).abs() < 1e-3);
        assert!((results[1].score - 0.8 * 0.0821).abs() < 1e-3);
        assert_eq!(results[1].age, "5 years ago");
    }

    #[test]
    fn test_temporal_none_equals_plain_search() {
        let records = vec![
            tagged("a", vec![1.0, 0.0], "lang", "en"),
            tagged("b", vec![0.8, 0.6], "lang", "en"),
        ];
        let query = vec![1.0, 0.0];
        let req = temporal_req(DecayStrength::None, Utc::now());
        let temporal =
            temporal_search(records.iter(), &req, &query, &QueryContext::default()).unwrap();

        let plain_req = search_req(query.clone(), 10);
        let plain =
            vector_search(records.iter(), &plain_req, &QueryContext::default()).unwrap();

        assert_eq!(temporal.len(), plain.len());
        for (t, p) in temporal.iter().zip(plain.iter()) {
            assert_eq!(t.record.id, p.record.id);
            assert_eq!(t.score, p.score);
            assert_eq!(t.decay_factor, 1.0);
            assert_eq!(t.base_score, t.score);
        }
    }

    #[test]
    fn test_temporal_uses_metadata_time_field() {
        let reference = Utc::now();
        let mut r = record("r", vec![1.0]);
        let published = (reference - Duration::days(366)).to_rfc3339();
        r.metadata.insert("published_at".to_string(), published);

        let mut req = TemporalSearchRequest {
            query: "q".into(),
            temporal_decay: DecayStrength::Strong,
            reference_time: Some(reference),
            time_field: "published_at".to_string(),
            ..Default::default()
        };
        req.validate().unwrap();

        let results =
            temporal_search([&r], &req, &[1.0], &QueryContext::default()).unwrap();
        assert_eq!(results[0].age, "1 year ago");
        assert!(results[0].decay_factor < 0.62);
    }
}
