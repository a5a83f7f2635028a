//! Cache-aware embedding client

use crate::LlmError;
use gloss_domain::{CacheNamespace, EmbeddingBackend, ResponseCache};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Embedding client that serves per-text cache hits and embeds only the
/// misses, in one backend call, preserving input order.
pub struct CachedEmbedder<E, C> {
    backend: Arc<E>,
    cache: Arc<C>,
}

impl<E, C> CachedEmbedder<E, C>
where
    E: EmbeddingBackend,
    C: ResponseCache,
{
    /// Create an embedder from shared backend and cache handles
    pub fn new(backend: Arc<E>, cache: Arc<C>) -> Self {
        Self { backend, cache }
    }

    fn cache_key(model: &str, text: &str) -> String {
        format!("{}\n{}", model, text)
    }

    /// Embed a batch of texts, returning one vector per input in order
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut cached: HashMap<String, Vec<f32>> = HashMap::new();
        let mut to_embed: Vec<String> = Vec::new();

        for text in texts {
            if cached.contains_key(text) || to_embed.contains(text) {
                continue;
            }
            let key = Self::cache_key(model, text);
            match self
                .cache
                .get(CacheNamespace::Embeddings, &key)
                .map_err(|e| LlmError::Cache(e.to_string()))?
            {
                Some(stored) => {
                    let vector: Vec<f32> = serde_json::from_str(&stored)
                        .map_err(|e| LlmError::InvalidData(e.to_string()))?;
                    cached.insert(text.clone(), vector);
                }
                None => to_embed.push(text.clone()),
            }
        }

        if !to_embed.is_empty() {
            debug!(misses = to_embed.len(), total = texts.len(), "embedding cache misses");
            let fresh = self
                .backend
                .embed(model, &to_embed)
                .await
                .map_err(|e| LlmError::Embedding(e.to_string()))?;
            if fresh.len() != to_embed.len() {
                return Err(LlmError::Embedding(format!(
                    "backend returned {} vectors for {} texts",
                    fresh.len(),
                    to_embed.len()
                )));
            }

            for (text, vector) in to_embed.into_iter().zip(fresh.into_iter()) {
                let key = Self::cache_key(model, &text);
                let value = serde_json::to_string(&vector)
                    .map_err(|e| LlmError::InvalidData(e.to_string()))?;
                self.cache
                    .put(CacheNamespace::Embeddings, &key, &value)
                    .map_err(|e| LlmError::Cache(e.to_string()))?;
                cached.insert(text, vector);
            }
        }

        Ok(texts.iter().map(|t| cached[t].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockEmbeddingBackend;
    use gloss_store::SqliteStore;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn embedder(
        backend: MockEmbeddingBackend,
    ) -> CachedEmbedder<MockEmbeddingBackend, SqliteStore> {
        CachedEmbedder::new(Arc::new(backend), Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let backend = MockEmbeddingBackend::new(16);
        let expected: Vec<Vec<f32>> = ["a", "b", "c"]
            .iter()
            .map(|t| backend.embed_one(t))
            .collect();
        let embedder = embedder(backend);

        let out = embedder
            .embed("text-embedding-3-large", &strings(&["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let backend = MockEmbeddingBackend::new(16);
        let handle = backend.clone();
        let embedder = embedder(backend);
        let texts = strings(&["x", "y"]);

        let first = embedder.embed("m", &texts).await.unwrap();
        assert_eq!(handle.call_count(), 1);

        let second = embedder.embed("m", &texts).await.unwrap();
        assert_eq!(first, second);
        // No further backend calls: everything was cached
        assert_eq!(handle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_texts_share_one_embedding_call() {
        let backend = MockEmbeddingBackend::new(8);
        let handle = backend.clone();
        let embedder = embedder(backend);

        let out = embedder
            .embed("m", &strings(&["same", "same", "same"]))
            .await
            .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], out[1]);
        assert_eq!(handle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_cache_mixes_hit_and_miss() {
        let backend = MockEmbeddingBackend::new(8);
        let handle = backend.clone();
        let embedder = embedder(backend);

        embedder.embed("m", &strings(&["warm"])).await.unwrap();
        let out = embedder
            .embed("m", &strings(&["cold", "warm"]))
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        // Two backend calls total: one warmup, one for the single miss
        assert_eq!(handle.call_count(), 2);
    }
}
