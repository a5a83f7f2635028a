//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. Implementations live in other crates: the SQLite response
//! cache in gloss-store, the HTTP chat/embedding backends in gloss-llm.

use serde::{Deserialize, Serialize};

/// The two independent cache namespaces. Completions and embeddings follow
/// the same key/value protocol but must never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Chat completion responses
    Completions,
    /// Text embedding vectors
    Embeddings,
}

impl CacheNamespace {
    /// Stable string form used as part of the storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Completions => "completions",
            CacheNamespace::Embeddings => "embeddings",
        }
    }
}

/// The two clustering purposes a task can hold a fitted model for.
/// Each (task, purpose) pair owns one independent model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPurpose {
    /// Coarse topical clustering of raw example texts
    Topical,
    /// Semantic clustering of edge-case rule condition clauses
    Semantic,
}

impl ModelPurpose {
    /// Stable string form used as part of the storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelPurpose::Topical => "topical",
            ModelPurpose::Semantic => "semantic",
        }
    }
}

/// Durable key-value store for model responses.
///
/// Keys are exact: the full prompt and model name participate, so any
/// whitespace or content difference is a miss. The store is append-only
/// (no eviction) and must provide read-your-writes within a run.
pub trait ResponseCache: Send + Sync {
    /// Error type for cache operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up a previously stored value
    fn get(&self, ns: CacheNamespace, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store a value. Re-putting the same key is permitted and idempotent.
    fn put(&self, ns: CacheNamespace, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Whether a key is present without fetching the value
    fn contains(&self, ns: CacheNamespace, key: &str) -> Result<bool, Self::Error>;
}

/// One message in a chat prompt sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system" or "user"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Build a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-model generation parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationArgs {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum completion tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling seed for reproducibility, where supported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// A completed chat response with token accounting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The response text
    pub content: String,
    /// Separate reasoning trace, for models that expose one
    pub reasoning: Option<String>,
    /// Prompt tokens consumed
    pub input_tokens: u64,
    /// Completion tokens produced
    pub output_tokens: u64,
}

/// Opaque completion capability: given a prompt sequence, return a
/// completion with token counts.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Error type for completion calls
    type Error: std::error::Error + Send + Sync + 'static;

    /// Request one completion for a message sequence
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        args: &GenerationArgs,
    ) -> Result<Completion, Self::Error>;
}

/// Opaque embedding capability: given a batch of texts, return one vector
/// per text, in input order.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Error type for embedding calls
    type Error: std::error::Error + Send + Sync + 'static;

    /// Embed a batch of texts
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_do_not_collide() {
        assert_ne!(
            CacheNamespace::Completions.as_str(),
            CacheNamespace::Embeddings.as_str()
        );
    }

    #[test]
    fn test_chat_message_constructors() {
        let sys = ChatMessage::system("be careful");
        assert_eq!(sys.role, "system");
        let user = ChatMessage::user("annotate this");
        assert_eq!(user.role, "user");
    }
}
