//! Search primitives: request shapes, temporal decay, and the shared query
//! pipeline.
//!
//! All three query variants (vector, advanced, temporal) run the same
//! pipeline in [`engine`]: snapshot → dimension skip → filter → score →
//! rank → truncate. [`types`] holds the wire-level request and result shapes;
//! [`temporal`] the decay model.

/// Shared query pipeline and cooperative cancellation.
pub mod engine;
/// Temporal decay: strengths, scorer, document-time resolution, ages.
pub mod temporal;
/// Request and result shapes with validation.
pub mod types;

pub use engine::{CancelToken, QueryContext};
pub use temporal::{DecayStrength, TemporalConfig, TemporalScorer};
pub use types::{
    AdvancedSearchRequest, HybridWeight, SearchOptions, SearchRequest, SearchResult,
    TemporalSearchRequest, TemporalSearchResult,
};
