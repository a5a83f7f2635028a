//! Error types for the synthesizer

use thiserror::Error;

/// Errors that can occur during synthesis
#[derive(Error, Debug)]
pub enum SynthesizerError {
    /// Storage failure (cache or model persistence)
    #[error("Store error: {0}")]
    Store(#[from] gloss_store::StoreError),

    /// Completion or embedding client failure
    #[error("LLM error: {0}")]
    Llm(#[from] gloss_llm::LlmError),

    /// Clustering or projection failure
    #[error("Clustering error: {0}")]
    Cluster(#[from] gloss_cluster::ClusterError),
}
