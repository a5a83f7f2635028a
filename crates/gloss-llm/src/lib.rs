//! Gloss LLM Layer
//!
//! Pluggable chat and embedding backends plus the batched, cache-aware
//! completion client the annotation pipeline runs on.
//!
//! # Architecture
//!
//! This crate implements the `ChatBackend` and `EmbeddingBackend` traits
//! from `gloss-domain` and layers two cache-aware clients on top:
//!
//! - [`BatchedClient`]: issues concurrent completion calls in bounded-size
//!   batches, merges cache hits with fresh results preserving input order,
//!   isolates batch failures, and accumulates token cost
//! - [`CachedEmbedder`]: per-text cached embedding lookups with one backend
//!   call for the misses
//!
//! # Backends
//!
//! - [`OpenAiChatBackend`] / [`OpenAiEmbeddingBackend`]: OpenAI-compatible
//!   HTTP APIs
//! - [`MockChatBackend`] / [`MockEmbeddingBackend`]: deterministic mocks for
//!   testing
//!
//! # Examples
//!
//! ```
//! use gloss_llm::MockChatBackend;
//! use gloss_domain::{ChatBackend, ChatMessage, GenerationArgs};
//!
//! # tokio_test::block_on(async {
//! let backend = MockChatBackend::new("Hello from LLM!");
//! let messages = [ChatMessage::user("test prompt")];
//! let completion = backend
//!     .complete("gpt-4.1", &messages, &GenerationArgs::default())
//!     .await
//!     .unwrap();
//! assert_eq!(completion.content, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod batch;
pub mod embed;
pub mod mock;
pub mod models;
pub mod openai;

pub use batch::{BatchRun, BatchedClient};
pub use embed::CachedEmbedder;
pub use mock::{MockChatBackend, MockEmbeddingBackend};
pub use openai::{OpenAiChatBackend, OpenAiEmbeddingBackend};

use thiserror::Error;

/// Errors surfaced by the batched client and cached embedder.
///
/// Provider-side completion failures are not here: those are converted into
/// failed-batch indices and retried, never propagated.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Model alias missing from the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Cache read/write failure. A hard error rather than a retry: spinning
    /// on a broken disk would never converge.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Embedding backend failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Malformed stored payload
    #[error("Invalid cached data: {0}")]
    InvalidData(String),
}
