//! Temporal decay scoring.
//!
//! A decay strength maps to a rate λ; the decay factor for a document of age
//! Δt years is `exp(−λ·Δt)`. Ages are measured against a reference time
//! (defaulting to now) using a configurable metadata field, falling back to
//! the record's own timestamps.

use crate::config;
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strength of temporal decay applied by a temporal search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayStrength {
    /// λ = 0.5, rapid decay: ~61% score retained after one year.
    Strong,
    /// λ = 0.1, moderate decay: ~90% score retained after one year.
    Medium,
    /// λ = 0.01, slow decay: ~99% score retained after one year.
    Weak,
    /// λ = 0, no decay.
    #[default]
    None,
}

impl DecayStrength {
    /// The decay rate for this strength.
    pub fn lambda(self) -> f64 {
        match self {
            DecayStrength::Strong => config::DECAY_LAMBDA_STRONG,
            DecayStrength::Medium => config::DECAY_LAMBDA_MEDIUM,
            DecayStrength::Weak => config::DECAY_LAMBDA_WEAK,
            DecayStrength::None => 0.0,
        }
    }
}

/// Resolved temporal configuration for one query.
#[derive(Debug, Clone)]
pub struct TemporalConfig {
    /// Decay rate.
    pub lambda: f64,
    /// Time to compute ages from.
    pub reference_time: DateTime<Utc>,
    /// Metadata field consulted first for the document timestamp.
    pub time_field: String,
}

/// Applies temporal decay to similarity scores.
#[derive(Debug, Clone)]
pub struct TemporalScorer {
    config: TemporalConfig,
}

impl TemporalScorer {
    /// Creates a scorer for the given configuration.
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// The decay factor `exp(−λ·Δt)` for a document timestamp. Future
    /// timestamps do not decay; λ = 0 always yields 1.0.
    pub fn decay_factor(&self, document_time: DateTime<Utc>) -> f64 {
        if self.config.lambda == 0.0 {
            return 1.0;
        }
        let delta_seconds = (self.config.reference_time - document_time).num_seconds() as f64;
        let delta_years = (delta_seconds / config::SECONDS_PER_YEAR).max(0.0);
        (-self.config.lambda * delta_years).exp()
    }

    /// A similarity score with decay applied.
    pub fn apply_decay(&self, score: f64, document_time: DateTime<Utc>) -> f64 {
        score * self.decay_factor(document_time)
    }

    /// Resolves the timestamp used for decay: the configured metadata field
    /// (RFC 3339), then `created_at`, then `updated_at`, then now.
    pub fn document_time(&self, record: &Record) -> DateTime<Utc> {
        if let Some(raw) = record.metadata.get(&self.config.time_field) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return parsed.with_timezone(&Utc);
            }
        }
        if record.created_at != DateTime::UNIX_EPOCH {
            return record.created_at;
        }
        if record.updated_at != DateTime::UNIX_EPOCH {
            return record.updated_at;
        }
        Utc::now()
    }

    /// The reference time this scorer measures ages against.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.config.reference_time
    }
}

/// Human-readable age of a timestamp relative to a reference time.
pub fn format_age(t: DateTime<Utc>, reference: DateTime<Utc>) -> String {
    let hours = (reference - t).num_seconds() as f64 / 3600.0;

    let years = (hours / (24.0 * 365.25)) as i64;
    if years > 0 {
        return if years == 1 {
            "1 year ago".to_string()
        } else {
            format!("{years} years ago")
        };
    }

    let months = (hours / (24.0 * 30.44)) as i64;
    if months > 0 {
        return if months == 1 {
            "1 month ago".to_string()
        } else {
            format!("{months} months ago")
        };
    }

    let days = (hours / 24.0) as i64;
    if days > 0 {
        return if days == 1 {
            "1 day ago".to_string()
        } else {
            format!("{days} days ago")
        };
    }

    let whole_hours = hours as i64;
    if whole_hours > 0 {
        return if whole_hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{whole_hours} hours ago")
        };
    }

    "just now".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scorer(lambda: f64, reference: DateTime<Utc>) -> TemporalScorer {
        TemporalScorer::new(TemporalConfig {
            lambda,
            reference_time: reference,
            time_field: config::DEFAULT_TIME_FIELD.to_string(),
        })
    }

    fn years_ago(reference: DateTime<Utc>, years: f64) -> DateTime<Utc> {
        reference - Duration::seconds((years * config::SECONDS_PER_YEAR) as i64)
    }

    #[test]
    fn test_lambda_mapping() {
        assert_eq!(DecayStrength::Strong.lambda(), 0.5);
        assert_eq!(DecayStrength::Medium.lambda(), 0.1);
        assert_eq!(DecayStrength::Weak.lambda(), 0.01);
        assert_eq!(DecayStrength::None.lambda(), 0.0);
    }

    #[test]
    fn test_decay_strength_serde() {
        assert_eq!(
            serde_json::from_str::<DecayStrength>("\"strong\"").unwrap(),
            DecayStrength::Strong
        );
        assert!(serde_json::from_str::<DecayStrength>("\"extreme\"").is_err());
    }

    #[test]
    fn test_strong_decay_one_year() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let factor = s.decay_factor(years_ago(now, 1.0));
        assert!((factor - (-0.5f64).exp()).abs() < 1e-3, "factor={factor}");
    }

    #[test]
    fn test_strong_decay_five_years() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let factor = s.decay_factor(years_ago(now, 5.0));
        assert!((factor - (-2.5f64).exp()).abs() < 1e-3, "factor={factor}");
    }

    #[test]
    fn test_no_decay_factor_is_one() {
        let now = Utc::now();
        let s = scorer(0.0, now);
        assert_eq!(s.decay_factor(years_ago(now, 10.0)), 1.0);
    }

    #[test]
    fn test_future_documents_do_not_decay() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        assert_eq!(s.decay_factor(now + Duration::days(365)), 1.0);
    }

    #[test]
    fn test_apply_decay_multiplies() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let decayed = s.apply_decay(0.8, years_ago(now, 1.0));
        assert!((decayed - 0.8 * (-0.5f64).exp()).abs() < 1e-3);
    }

    #[test]
    fn test_document_time_prefers_metadata_field() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let mut record = Record::new("r", vec![1.0]);
        record.metadata.insert(
            "created_at".to_string(),
            "2020-06-01T00:00:00Z".to_string(),
        );
        let t = s.document_time(&record);
        assert_eq!(t.to_rfc3339(), "2020-06-01T00:00:00+00:00");
    }

    #[test]
    fn test_document_time_falls_back_to_record_timestamps() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let record = Record::new("r", vec![1.0]);
        assert_eq!(s.document_time(&record), record.created_at);
    }

    #[test]
    fn test_document_time_ignores_unparseable_metadata() {
        let now = Utc::now();
        let s = scorer(0.5, now);
        let mut record = Record::new("r", vec![1.0]);
        record
            .metadata
            .insert("created_at".to_string(), "last tuesday".to_string());
        assert_eq!(s.document_time(&record), record.created_at);
    }

    #[test]
    fn test_format_age_buckets() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(format_age(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_age(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_age(now - Duration::days(6), now), "6 days ago");
        assert_eq!(format_age(now - Duration::days(45), now), "1 month ago");
        assert_eq!(format_age(now - Duration::days(100), now), "3 months ago");
        assert_eq!(format_age(now - Duration::days(366), now), "1 year ago");
        assert_eq!(format_age(now - Duration::days(800), now), "2 years ago");
    }
}
