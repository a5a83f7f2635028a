//! Batched, cache-aware completion client
//!
//! Splits prompt sequences into fixed-size batches preserving order. Within
//! a batch, cache hits are served from the response cache and only misses go
//! out as concurrent requests; results are reassembled by original position,
//! not arrival order. A failure anywhere in a batch's gather withholds that
//! whole batch and reports its index for retry, without touching sibling
//! batches.

use crate::{models, LlmError};
use gloss_domain::{CacheNamespace, ChatBackend, ChatMessage, ResponseCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What goes into the cache for one completed prompt
#[derive(Debug, Serialize, Deserialize)]
struct CachedCompletion {
    response: String,
    reasoning: Option<String>,
}

/// Where each batch position gets its result from
enum Slot {
    /// Index into the batch's cache-hit list
    Hit(usize),
    /// Index into the batch's fresh-completion list
    Miss(usize),
}

/// Outcome of one `run` pass over all batches
#[derive(Debug)]
pub struct BatchRun {
    /// One entry per input prompt, in input order; `None` where the
    /// owning batch failed
    pub completions: Vec<Option<String>>,
    /// Indices of batches that must be retried
    pub failed_batches: Vec<usize>,
    /// Dollar cost of the fresh tokens spent in this pass
    pub cost: f64,
}

/// Batched completion client over a chat backend and a response cache
pub struct BatchedClient<B, C> {
    backend: Arc<B>,
    cache: Arc<C>,
}

impl<B, C> BatchedClient<B, C>
where
    B: ChatBackend,
    C: ResponseCache,
{
    /// Create a client from shared backend and cache handles
    pub fn new(backend: Arc<B>, cache: Arc<C>) -> Self {
        Self { backend, cache }
    }

    /// Cache key for one prompt sequence: the model and the full serialized
    /// messages participate, so any content difference is a miss.
    fn cache_key(model: &str, messages: &[ChatMessage]) -> String {
        let serialized = serde_json::to_string(messages).unwrap_or_default();
        format!("{}\n{}", model, serialized)
    }

    /// Run one pass over all prompts.
    ///
    /// Output order matches input order regardless of the cache hit/miss
    /// pattern or completion arrival order. Failed batches produce `None`
    /// entries and are reported by index; sibling batches are unaffected.
    pub async fn run(
        &self,
        model: &str,
        prompts: &[Vec<ChatMessage>],
        batch_size: usize,
    ) -> Result<BatchRun, LlmError> {
        let info = models::resolve(model).ok_or_else(|| LlmError::UnknownModel(model.to_string()))?;
        let args = models::default_args(model);
        let batch_size = batch_size.max(1);

        let mut completions: Vec<Option<String>> = Vec::with_capacity(prompts.len());
        let mut failed_batches = Vec::new();
        let mut total_input_tokens = 0u64;
        let mut total_output_tokens = 0u64;

        let batch_count = prompts.len().div_ceil(batch_size);
        debug!(batch_count, "running completion batches");

        for (batch_index, batch) in prompts.chunks(batch_size).enumerate() {
            // Partition into cache hits and misses, remembering where each
            // position's result will come from.
            let mut slots: Vec<Slot> = Vec::with_capacity(batch.len());
            let mut hits: Vec<String> = Vec::new();
            let mut misses: Vec<&Vec<ChatMessage>> = Vec::new();

            for messages in batch {
                let key = Self::cache_key(model, messages);
                match self
                    .cache
                    .get(CacheNamespace::Completions, &key)
                    .map_err(|e| LlmError::Cache(e.to_string()))?
                {
                    Some(stored) => {
                        let cached: CachedCompletion = serde_json::from_str(&stored)
                            .map_err(|e| LlmError::InvalidData(e.to_string()))?;
                        slots.push(Slot::Hit(hits.len()));
                        hits.push(cached.response);
                    }
                    None => {
                        slots.push(Slot::Miss(misses.len()));
                        misses.push(messages);
                    }
                }
            }

            if misses.is_empty() {
                debug!(batch_index, "batch served entirely from cache");
                completions.extend(hits.into_iter().map(Some));
                continue;
            }

            // Concurrent fan-out for the misses only
            let futures = misses
                .iter()
                .map(|messages| self.backend.complete(model, messages, &args));
            let results = futures::future::join_all(futures).await;

            match collect_batch(results) {
                Ok(fresh) => {
                    for (messages, completion) in misses.iter().zip(fresh.iter()) {
                        total_input_tokens += completion.input_tokens;
                        total_output_tokens += completion.output_tokens;

                        let key = Self::cache_key(model, messages);
                        let value = serde_json::to_string(&CachedCompletion {
                            response: completion.content.clone(),
                            reasoning: completion.reasoning.clone(),
                        })
                        .map_err(|e| LlmError::InvalidData(e.to_string()))?;
                        self.cache
                            .put(CacheNamespace::Completions, &key, &value)
                            .map_err(|e| LlmError::Cache(e.to_string()))?;
                    }

                    for slot in &slots {
                        let content = match slot {
                            Slot::Hit(i) => hits[*i].clone(),
                            Slot::Miss(i) => fresh[*i].content.clone(),
                        };
                        completions.push(Some(content));
                    }
                    debug!(batch_index, "batch done");
                }
                Err(message) => {
                    warn!(batch_index, error = %message, "batch failed, will retry");
                    failed_batches.push(batch_index);
                    completions.extend(std::iter::repeat_with(|| None).take(batch.len()));
                }
            }
        }

        Ok(BatchRun {
            completions,
            failed_batches,
            cost: models::price(info, total_input_tokens, total_output_tokens),
        })
    }

    /// Run until every batch succeeds.
    ///
    /// Retries only the failed batches each round: succeeded prompts are
    /// cache hits on re-runs, so no tokens are re-spent. The loop has no
    /// backoff and no attempt cap; it either converges or blocks with the
    /// caller (transient provider failures are the expected cause).
    pub async fn run_to_completion(
        &self,
        model: &str,
        prompts: &[Vec<ChatMessage>],
        batch_size: usize,
    ) -> Result<(Vec<String>, f64), LlmError> {
        let mut total_cost = 0.0;
        loop {
            let run = self.run(model, prompts, batch_size).await?;
            total_cost += run.cost;

            if run.failed_batches.is_empty() {
                info!(total_cost, "all batches complete");
                let completions = run
                    .completions
                    .into_iter()
                    .map(|c| c.unwrap_or_default())
                    .collect();
                return Ok((completions, total_cost));
            }
            warn!(
                failed = run.failed_batches.len(),
                indices = ?run.failed_batches,
                "retrying failed batches"
            );
        }
    }
}

/// All-or-nothing view of a batch's gathered results: the first error
/// withholds the whole batch.
fn collect_batch<T, E: std::fmt::Display>(results: Vec<Result<T, E>>) -> Result<Vec<T>, String> {
    let mut collected = Vec::with_capacity(results.len());
    for r in results {
        match r {
            Ok(v) => collected.push(v),
            Err(e) => return Err(e.to_string()),
        }
    }
    Ok(collected)
}
