//! Gloss Annotator
//!
//! Turns raw texts into structured annotation records by prompting an LLM
//! against a natural-language guideline.
//!
//! # Architecture
//!
//! ```text
//! Texts → IdentityMapper → Embeddings → Topical clustering
//!       → Batched LLM annotation → Parser (strict, then salvage)
//!       → AnnotationRecords
//! ```
//!
//! # Key pieces
//!
//! - **Prompt building**: the fixed annotation template with guideline and
//!   text slots, producing the five-field JSON contract
//! - **Parsing**: a strict JSON path plus a salvage line-scanner that never
//!   fails, because LLM output is untrusted free text
//! - **Engine**: batch and single-example orchestration with lazy-fit,
//!   persisted topical clustering models
//!
//! # Example
//!
//! ```no_run
//! use gloss_annotator::{AnnotationEngine, AnnotatorOptions};
//! use gloss_llm::{MockChatBackend, MockEmbeddingBackend};
//! use gloss_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::in_memory()?;
//! let engine = AnnotationEngine::new(
//!     store.clone(),
//!     Arc::new(MockChatBackend::new("{}")),
//!     Arc::new(MockEmbeddingBackend::new(64)),
//!     Arc::new(store),
//!     AnnotatorOptions::default(),
//! );
//!
//! let records = engine
//!     .annotate_batch("task-1", &["Some text".to_string()], "guideline")
//!     .await?;
//! println!("{} records", records.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod engine;
mod error;
mod options;
mod parser;
mod prompt;

pub use engine::AnnotationEngine;
pub use error::AnnotatorError;
pub use options::AnnotatorOptions;
pub use parser::{parse_annotation, Parsed, ParsedAnnotation};
pub use prompt::build_annotation_messages;
