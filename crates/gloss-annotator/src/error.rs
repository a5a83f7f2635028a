//! Error types for the annotator

use thiserror::Error;

/// Errors that can occur during annotation
#[derive(Error, Debug)]
pub enum AnnotatorError {
    /// Storage failure (identity mapping, cache, or model persistence)
    #[error("Store error: {0}")]
    Store(#[from] gloss_store::StoreError),

    /// Completion or embedding client failure
    #[error("LLM error: {0}")]
    Llm(#[from] gloss_llm::LlmError),

    /// Clustering or projection failure
    #[error("Clustering error: {0}")]
    Cluster(#[from] gloss_cluster::ClusterError),

    /// Single-example annotation requested before any batch has fit a
    /// topical model for the task. Predicting against a nonexistent model
    /// is meaningless, so this surfaces to the caller.
    #[error("No fitted topical model for task '{0}'; run a batch annotation first")]
    ModelNotFitted(String),

    /// Empty input batch
    #[error("No examples to annotate")]
    EmptyBatch,
}
