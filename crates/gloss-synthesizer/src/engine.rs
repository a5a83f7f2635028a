//! The synthesis engine: clustering, per-cluster categorization, and
//! cross-cluster merge.

use crate::error::SynthesizerError;
use crate::parser::{parse_aggregation, parse_merge};
use crate::prompt::{build_aggregation_messages, build_merge_messages};
use crate::types::{ImprovementRecord, SynthesisRecord, SynthesisResult, SynthesizerOptions};
use gloss_cluster::{Clusterer, ConstrainedKMeans, FittedModel, Pca, SizeBounds};
use gloss_domain::record::is_empty_sentinel;
use gloss_domain::{rule, ChatBackend, EmbeddingBackend, ModelPurpose, ResponseCache};
use gloss_llm::{BatchedClient, CachedEmbedder};
use gloss_store::SqliteStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Category accumulator preserving first-seen insertion order of keys.
/// Exact-match descriptions union their member sets.
#[derive(Default)]
struct OrderedCategories {
    entries: Vec<(String, Vec<String>)>,
}

impl OrderedCategories {
    fn add(&mut self, description: String, uids: Vec<String>) {
        match self.entries.iter_mut().find(|(d, _)| *d == description) {
            Some((_, members)) => members.extend(uids),
            None => self.entries.push((description, uids)),
        }
    }

    fn descriptions(&self) -> Vec<String> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }
}

/// Orchestrates edge-case synthesis for a task.
///
/// The semantic clustering model is fit lazily on the first synthesis run
/// for a task and persisted; later runs use it purely for prediction.
pub struct SynthesisEngine<B, E, C>
where
    B: ChatBackend,
    E: EmbeddingBackend,
    C: ResponseCache,
{
    store: SqliteStore,
    chat: BatchedClient<B, C>,
    embedder: CachedEmbedder<E, C>,
    options: SynthesizerOptions,
    fit_lock: tokio::sync::Mutex<()>,
}

impl<B, E, C> SynthesisEngine<B, E, C>
where
    B: ChatBackend,
    E: EmbeddingBackend,
    C: ResponseCache,
{
    /// Create an engine over shared store, backend, and cache handles
    pub fn new(
        store: SqliteStore,
        chat_backend: Arc<B>,
        embedding_backend: Arc<E>,
        cache: Arc<C>,
        options: SynthesizerOptions,
    ) -> Self {
        Self {
            store,
            chat: BatchedClient::new(chat_backend, Arc::clone(&cache)),
            embedder: CachedEmbedder::new(embedding_backend, cache),
            options,
            fit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Consolidate the edge-case rules in `records` into categories.
    ///
    /// Records whose `guideline_improvement` is the EMPTY sentinel are
    /// ignored. Zero qualifying rules yield an empty result; exactly one
    /// becomes its own `edge_case_0` category with projection (0, 0) and no
    /// clustering model is fit or touched.
    pub async fn synthesize(
        &self,
        task_id: &str,
        records: &[SynthesisRecord],
        guideline: &str,
    ) -> Result<SynthesisResult, SynthesizerError> {
        let filtered: Vec<&SynthesisRecord> = records
            .iter()
            .filter(|r| !is_empty_sentinel(&r.guideline_improvement))
            .collect();

        info!(task_id, rules = filtered.len(), "starting synthesis");

        if filtered.is_empty() {
            return Ok(SynthesisResult::default());
        }
        if filtered.len() == 1 {
            return Ok(single_rule_result(filtered[0]));
        }

        // Embed the condition clause of every rule
        let conditions: Vec<String> = filtered
            .iter()
            .map(|r| rule::condition_clause(&r.guideline_improvement).to_string())
            .collect();
        let embeddings = self
            .embedder
            .embed(&self.options.embedding_model, &conditions)
            .await?;

        // Target ~rules_per_cluster rules per cluster, at least one cluster
        let k = filtered.len() / self.options.rules_per_cluster + 1;
        let (model, labels) = self.semantic_model(task_id, &embeddings, k).await?;
        let projections = model.pca.transform_batch(&embeddings);

        // Phase 1: per-cluster categorization
        let categories = self
            .categorize_clusters(task_id, guideline, &filtered, &labels, model.clusterer.k())
            .await?;

        // Phase 2: cross-cluster merge, skipped when only one cluster held rules
        let populated_clusters = {
            let mut seen: Vec<usize> = labels.clone();
            seen.sort_unstable();
            seen.dedup();
            seen.len()
        };
        let merged = if populated_clusters > 1 {
            self.merge_categories(guideline, categories).await?
        } else {
            categories
        };

        Ok(finalize(filtered, projections, merged))
    }

    /// Load the task's semantic model, or fit and persist one with the
    /// step-function size bounds. Returns the model and per-rule labels.
    async fn semantic_model(
        &self,
        task_id: &str,
        embeddings: &[Vec<f32>],
        k: usize,
    ) -> Result<(FittedModel, Vec<usize>), SynthesizerError> {
        let _guard = self.fit_lock.lock().await;

        if let Some(model) = self.store.load_model(task_id, ModelPurpose::Semantic)? {
            info!(task_id, "reusing persisted semantic model");
            let labels = embeddings.iter().map(|e| model.clusterer.predict(e)).collect();
            return Ok((model, labels));
        }

        let n = embeddings.len();
        let bounds = SizeBounds::for_dataset_size(n);
        let (constrained, labels) = ConstrainedKMeans::fit(embeddings, k, bounds)?;
        let model = FittedModel {
            pca: Pca::fit(embeddings)?,
            clusterer: Clusterer::Constrained(constrained),
        };
        self.store
            .save_model(task_id, ModelPurpose::Semantic, &model)?;
        info!(task_id, k, n, "fitted semantic clustering model");
        Ok((model, labels))
    }

    /// Ask the LLM to partition each cluster's rules into named categories.
    async fn categorize_clusters(
        &self,
        task_id: &str,
        guideline: &str,
        filtered: &[&SynthesisRecord],
        labels: &[usize],
        k: usize,
    ) -> Result<OrderedCategories, SynthesizerError> {
        // Per-cluster member indices into `filtered`, preserving input order
        let mut cluster_members: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (i, &label) in labels.iter().enumerate() {
            if label < k {
                cluster_members[label].push(i);
            }
        }

        let populated: Vec<&Vec<usize>> =
            cluster_members.iter().filter(|m| !m.is_empty()).collect();
        let prompts: Vec<_> = populated
            .iter()
            .map(|members| {
                let rules: Vec<String> = members
                    .iter()
                    .map(|&i| filtered[i].guideline_improvement.clone())
                    .collect();
                build_aggregation_messages(guideline, &rules)
            })
            .collect();

        let (responses, cost) = self
            .chat
            .run_to_completion(&self.options.aggregation_model, &prompts, self.options.batch_size)
            .await?;
        info!(task_id, clusters = populated.len(), cost, "aggregation phase complete");

        let mut categories = OrderedCategories::default();
        for (members, response) in populated.iter().zip(responses.iter()) {
            for category in parse_aggregation(response) {
                // Rule numbers are 1-based into this cluster's list; numbers
                // beyond the cluster's actual size are discarded.
                let uids: Vec<String> = category
                    .edge_cases
                    .iter()
                    .filter(|&&n| n >= 1 && n <= members.len())
                    .map(|&n| filtered[members[n - 1]].uid.clone())
                    .collect();
                if uids.len() < category.edge_cases.len() {
                    warn!(
                        description = %category.category_description,
                        "discarded out-of-range rule numbers from aggregation response"
                    );
                }
                categories.add(category.category_description, uids);
            }
        }
        Ok(categories)
    }

    /// Ask the LLM which categories describe near-identical situations and
    /// fold their members together under the merged description.
    async fn merge_categories(
        &self,
        guideline: &str,
        categories: OrderedCategories,
    ) -> Result<OrderedCategories, SynthesizerError> {
        info!(categories = categories.entries.len(), "categories before merge");

        let descriptions = categories.descriptions();
        let prompts = vec![build_merge_messages(guideline, &descriptions)];
        let (responses, cost) = self
            .chat
            .run_to_completion(&self.options.aggregation_model, &prompts, 1)
            .await?;
        info!(cost, "merge phase complete");

        let suggestions = parse_merge(&responses[0]);

        let mut merged = OrderedCategories::default();
        for (position, (description, members)) in categories.entries.into_iter().enumerate() {
            // Positions are 1-based in the prompt the LLM saw
            let key = suggestions
                .iter()
                .find(|s| s.indices.contains(&(position + 1)))
                .map(|s| s.merged_rule.clone())
                .unwrap_or(description);
            merged.add(key, members);
        }
        Ok(merged)
    }
}

/// The single-rule shortcut: one category, fixed origin projection,
/// no clustering model involved.
fn single_rule_result(record: &SynthesisRecord) -> SynthesisResult {
    let mut result = SynthesisResult::default();
    result.suggestions.insert(
        "edge_case_0".to_string(),
        record.guideline_improvement.clone(),
    );
    result.improvement_clusters.push(ImprovementRecord {
        uid: record.uid.clone(),
        edge_case_id: Some(0),
        pca_x: 0.0,
        pca_y: 0.0,
        confidence: record.confidence,
        guideline_improvement: Some(record.guideline_improvement.clone()),
        low_level_guideline_improvement: record.guideline_improvement.clone(),
        text_to_annotate: record.text_to_annotate.clone(),
        annotation: record.annotation.clone(),
        analyses: record.analyses.clone(),
        raw_annotations: record.raw_annotations.clone(),
    });
    result
}

/// Assign dense category ids in first-seen order, write them back onto the
/// contributing records, and count the rules no category claimed.
fn finalize(
    filtered: Vec<&SynthesisRecord>,
    projections: Vec<(f64, f64)>,
    merged: OrderedCategories,
) -> SynthesisResult {
    let mut result = SynthesisResult::default();

    // uid → (dense id, category description)
    let mut assignment: std::collections::HashMap<&str, (usize, &str)> =
        std::collections::HashMap::new();
    for (id, (description, members)) in merged.entries.iter().enumerate() {
        result
            .suggestions
            .insert(format!("edge_case_{}", id), description.clone());
        for uid in members {
            assignment.entry(uid.as_str()).or_insert((id, description));
        }
    }

    for (record, (pca_x, pca_y)) in filtered.into_iter().zip(projections) {
        let assigned = assignment.get(record.uid.as_str());
        if assigned.is_none() {
            result.dropped_rules += 1;
        }
        result.improvement_clusters.push(ImprovementRecord {
            uid: record.uid.clone(),
            edge_case_id: assigned.map(|(id, _)| *id),
            pca_x,
            pca_y,
            confidence: record.confidence,
            guideline_improvement: assigned.map(|(_, d)| d.to_string()),
            low_level_guideline_improvement: record.guideline_improvement.clone(),
            text_to_annotate: record.text_to_annotate.clone(),
            annotation: record.annotation.clone(),
            analyses: record.analyses.clone(),
            raw_annotations: record.raw_annotations.clone(),
        });
    }

    if result.dropped_rules > 0 {
        warn!(
            dropped = result.dropped_rules,
            "rules left uncategorized by the aggregation responses"
        );
    }
    result
}
