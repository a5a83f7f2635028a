//! Gloss Synthesizer
//!
//! Turns a pile of per-example edge-case rules into a small set of
//! consolidated, generalizable guideline-improvement categories.
//!
//! # Pipeline
//!
//! ```text
//! Records → filter (non-EMPTY rules) → embed condition clauses
//!         → size-constrained clustering (K = N/15 + 1)
//!         → per-cluster LLM categorization (aggregation prompt)
//!         → cross-cluster LLM merge (merge prompt)
//!         → dense category ids + per-record write-back
//! ```
//!
//! The two LLM phases build consensus: the aggregation phase names
//! categories within each semantic cluster, and the merge phase collapses
//! near-duplicate categories across clusters. Both responses are untrusted
//! and go through strict-then-fallback parsers.

#![warn(missing_docs)]

mod engine;
mod error;
mod parser;
mod prompt;
mod types;

pub use engine::SynthesisEngine;
pub use error::SynthesizerError;
pub use parser::{parse_aggregation, parse_merge, AggregationCategory, MergeGroup};
pub use prompt::{build_aggregation_messages, build_merge_messages, NO_MERGE_SENTINEL};
pub use types::{ImprovementRecord, SynthesisRecord, SynthesisResult, SynthesizerOptions};
