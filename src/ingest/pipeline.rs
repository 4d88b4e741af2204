//! The ingestion pipeline: source → embedder → batched storage writes.
//!
//! Strictly pull-based from the source and push-based to storage; the only
//! buffer is the current batch. Per-record failures are recovered locally and
//! tallied under their reason; only source-open failures propagate. The
//! deadline is checked between record reads — a fired deadline returns the
//! accumulated stats with a `Cancelled` outcome, never a panic.

use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::ingest::{IngestConfig, Source, SourceRecord};
use crate::record::Record;
use crate::storage::VectorStore;
use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// How an ingestion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The source reached end-of-stream and the final batch was flushed.
    Completed,
    /// The deadline fired between record reads; the buffered batch was not
    /// flushed.
    Cancelled,
}

/// Accounting emitted by an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestStats {
    /// Records pulled from the source (read errors excluded).
    pub total_records: usize,
    /// Records written to storage (or counted as written in dry-run mode).
    pub success: usize,
    /// Records that failed; break-down in `failure_reasons`.
    pub failure: usize,
    /// Records skipped for empty text.
    pub skipped: usize,
    /// Wall-clock duration of the run.
    pub duration: Duration,
    /// `success / duration` when the duration is non-zero.
    pub records_per_second: f64,
    /// Failure counts keyed by reason: `read_error`, `embed_error`,
    /// `embedder_not_multimodal`, `storage_error`.
    pub failure_reasons: HashMap<String, usize>,
    /// How the run ended.
    pub outcome: IngestOutcome,
    /// The namespace applied to ingested records, if any.
    pub namespace: Option<String>,
}

impl IngestStats {
    fn new(namespace: Option<String>) -> Self {
        Self {
            total_records: 0,
            success: 0,
            failure: 0,
            skipped: 0,
            duration: Duration::ZERO,
            records_per_second: 0.0,
            failure_reasons: HashMap::new(),
            outcome: IngestOutcome::Completed,
            namespace,
        }
    }

    fn fail(&mut self, reason: &str) {
        self.failure += 1;
        *self.failure_reasons.entry(reason.to_string()).or_default() += 1;
    }
}

/// Moves an unbounded stream of records from a source into a storage backend,
/// embedding along the way.
pub struct Ingestor<'a> {
    source: &'a mut dyn Source,
    embedder: &'a dyn Embedder,
    storage: &'a dyn VectorStore,
    config: IngestConfig,
}

impl<'a> Ingestor<'a> {
    /// Wires a pipeline over the given collaborators.
    pub fn new(
        source: &'a mut dyn Source,
        embedder: &'a dyn Embedder,
        storage: &'a dyn VectorStore,
        config: IngestConfig,
    ) -> Self {
        Self {
            source,
            embedder,
            storage,
            config,
        }
    }

    /// Runs the pipeline until end-of-stream or the deadline, returning the
    /// accumulated statistics. Only a source-open failure returns `Err`.
    pub fn run(mut self, deadline: Option<Instant>) -> Result<IngestStats> {
        let started = Instant::now();
        let mut stats = IngestStats::new(self.config.namespace.clone());

        self.source.open(deadline).map_err(|e| match e {
            Error::SourceOpen(_) => e,
            other => Error::SourceOpen(other.to_string()),
        })?;
        tracing::info!(source = self.source.name(), "starting ingestion");

        let mut batch: Vec<Record> = Vec::with_capacity(self.config.batch_size.max(1));
        let outcome = loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(
                    total = stats.total_records,
                    "ingestion deadline fired, stopping"
                );
                break IngestOutcome::Cancelled;
            }

            let record = match self.source.next() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    if !batch.is_empty() {
                        self.flush(&mut batch, &mut stats);
                    }
                    break IngestOutcome::Completed;
                }
                Err(e) => {
                    stats.fail("read_error");
                    if self.config.verbose {
                        tracing::warn!(error = %e, "error reading record");
                    }
                    continue;
                }
            };

            stats.total_records += 1;
            if record.text.is_empty() {
                stats.skipped += 1;
                continue;
            }

            let embedding = match self.embed(&record) {
                Ok(embedding) => embedding,
                Err(Error::NotMultimodal) => {
                    stats.fail("embedder_not_multimodal");
                    continue;
                }
                Err(e) => {
                    stats.fail("embed_error");
                    if self.config.verbose {
                        tracing::warn!(error = %e, "error embedding record");
                    }
                    continue;
                }
            };
            if self.config.verbose && stats.total_records <= 3 {
                tracing::info!(
                    record = stats.total_records,
                    dimensions = embedding.len(),
                    "embedded record"
                );
            }

            batch.push(self.build_record(record, embedding, stats.total_records));
            if batch.len() >= self.config.batch_size.max(1) {
                self.flush(&mut batch, &mut stats);
            }

            if self.config.verbose && stats.total_records % 100 == 0 {
                tracing::info!(processed = stats.total_records, "ingestion progress");
            }
        };

        let _ = self.source.close();
        stats.duration = started.elapsed();
        if stats.duration.as_secs_f64() > 0.0 {
            stats.records_per_second = stats.success as f64 / stats.duration.as_secs_f64();
        }
        stats.outcome = outcome;

        tracing::info!(
            total = stats.total_records,
            success = stats.success,
            failure = stats.failure,
            skipped = stats.skipped,
            "ingestion finished"
        );
        Ok(stats)
    }

    /// Routes the record to image or text embedding based on its declared
    /// type and the embedder's advertised capabilities.
    fn embed(&self, record: &SourceRecord) -> Result<Vec<f64>> {
        if record.metadata.get("type").map(String::as_str) == Some("image") {
            let Some(multimodal) = self.embedder.as_multimodal() else {
                if self.config.verbose {
                    tracing::warn!(
                        embedder = self.embedder.name(),
                        path = %record.text,
                        "embedder does not support images, skipping record"
                    );
                }
                return Err(Error::NotMultimodal);
            };
            return multimodal.embed_image(&record.text);
        }
        self.embedder.embed(&record.text)
    }

    fn build_record(&self, record: SourceRecord, embedding: Vec<f64>, sequence: usize) -> Record {
        let id = record.id.filter(|id| !id.is_empty()).unwrap_or_else(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            format!("vec_{nanos}_{sequence}")
        });

        let mut metadata = record.metadata;
        if let Some(namespace) = &self.config.namespace {
            metadata.insert("namespace".to_string(), namespace.clone());
        }

        let now = Utc::now();
        Record {
            id,
            embedding,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    fn flush(&self, batch: &mut Vec<Record>, stats: &mut IngestStats) {
        if self.config.dry_run {
            stats.success += batch.len();
            if self.config.verbose {
                tracing::info!(batch = batch.len(), "dry run, skipping storage");
            }
            batch.clear();
            return;
        }

        for record in batch.drain(..) {
            let id = record.id.clone();
            match self.storage.store(record) {
                Ok(_) => stats.success += 1,
                Err(e) => {
                    stats.fail("storage_error");
                    if self.config.verbose {
                        tracing::warn!(id, error = %e, "error storing record");
                    }
                }
            }
        }
    }
}
