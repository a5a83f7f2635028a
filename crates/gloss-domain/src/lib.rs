//! Gloss Domain Layer
//!
//! This crate contains the core domain model for Gloss: the types that flow
//! through the annotation pipeline and the trait interfaces that all other
//! layers depend upon. It stays dependency-light and carries no I/O.
//!
//! ## Key Concepts
//!
//! - **Example**: a unit of text to annotate, with a stable per-task uid
//! - **AnnotationRecord**: one LLM judgment for an example, immutable once
//!   produced
//! - **Edge-case rule**: a `"when <condition> -> <action>"` statement flagged
//!   by the annotator when the guideline does not clearly resolve an example
//! - **EdgeCaseCategory**: a consolidated rule produced by synthesis
//!
//! ## Architecture
//!
//! Infrastructure implementations (SQLite store, HTTP backends) live in other
//! crates. This crate defines the boundary traits they implement.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod category;
pub mod example;
pub mod record;
pub mod rule;
pub mod traits;

// Re-exports for convenience
pub use category::EdgeCaseCategory;
pub use example::{Example, ExampleId};
pub use record::{AnnotationRecord, EDGE_CASE_EMPTY, UNCLASSIFIABLE_LABEL};
pub use traits::{
    CacheNamespace, ChatBackend, ChatMessage, Completion, EmbeddingBackend, GenerationArgs,
    ModelPurpose, ResponseCache,
};
