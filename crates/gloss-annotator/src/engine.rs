//! The annotation engine: orchestrates identity resolution, embedding,
//! topical clustering, batched LLM annotation, and parsing.

use crate::error::AnnotatorError;
use crate::options::AnnotatorOptions;
use crate::parser::{parse_annotation, Parsed};
use crate::prompt::build_annotation_messages;
use gloss_cluster::{Clusterer, FittedModel, KMeans, Pca};
use gloss_domain::{rule, AnnotationRecord, ChatBackend, EmbeddingBackend, ModelPurpose, ResponseCache};
use gloss_llm::{BatchedClient, CachedEmbedder};
use gloss_store::SqliteStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates annotation for a task: uid resolution, embedding, topical
/// cluster assignment, LLM calls, and parsing into records.
///
/// The topical clustering model is fit lazily on the first batch for a task
/// and persisted; later batches and single-example calls use it purely for
/// prediction and never refit.
pub struct AnnotationEngine<B, E, C>
where
    B: ChatBackend,
    E: EmbeddingBackend,
    C: ResponseCache,
{
    store: SqliteStore,
    chat: BatchedClient<B, C>,
    embedder: CachedEmbedder<E, C>,
    options: AnnotatorOptions,
    fit_lock: tokio::sync::Mutex<()>,
}

impl<B, E, C> AnnotationEngine<B, E, C>
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
        options: AnnotatorOptions,
    ) -> Self {
        Self {
            store,
            chat: BatchedClient::new(chat_backend, Arc::clone(&cache)),
            embedder: CachedEmbedder::new(embedding_backend, cache),
            options,
            fit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Annotate a batch of texts against a guideline.
    ///
    /// Steps: resolve uids, embed, obtain (or lazily fit) the topical
    /// clustering model, annotate through the batched client, parse, and
    /// assemble one record per input text in input order.
    pub async fn annotate_batch(
        &self,
        task_id: &str,
        texts: &[String],
        guideline: &str,
    ) -> Result<Vec<AnnotationRecord>, AnnotatorError> {
        if texts.is_empty() {
            return Err(AnnotatorError::EmptyBatch);
        }

        let uids = self.store.resolve_batch(task_id, texts)?;
        let embeddings = self
            .embedder
            .embed(&self.options.embedding_model, texts)
            .await?;

        let model = self.topical_model(task_id, &embeddings).await?;
        let placements: Vec<(usize, (f64, f64))> =
            embeddings.iter().map(|e| model.apply(e)).collect();

        let prompts: Vec<_> = texts
            .iter()
            .map(|text| build_annotation_messages(guideline, text))
            .collect();
        let (responses, cost) = self
            .chat
            .run_to_completion(&self.options.annotation_model, &prompts, self.options.batch_size)
            .await?;
        info!(task_id, examples = texts.len(), cost, "annotation batch complete");

        let records = texts
            .iter()
            .zip(uids)
            .zip(placements)
            .zip(responses)
            .map(|(((text, uid), (cluster_id, (pca_x, pca_y))), response)| {
                self.assemble(text, uid, cluster_id, pca_x, pca_y, response)
            })
            .collect();
        Ok(records)
    }

    /// Annotate one example against a previously fitted topical model.
    ///
    /// Fails with [`AnnotatorError::ModelNotFitted`] when no batch has been
    /// annotated for the task yet: a single point cannot fit a stable
    /// clustering. When the example is flagged as a new edge case and a
    /// semantic (rule) model exists for the task, the rule's condition
    /// clause is additionally projected into that model's 2-D space.
    pub async fn annotate_one(
        &self,
        task_id: &str,
        text: &str,
        guideline: &str,
    ) -> Result<AnnotationRecord, AnnotatorError> {
        let model = self
            .store
            .load_model(task_id, ModelPurpose::Topical)?
            .ok_or_else(|| AnnotatorError::ModelNotFitted(task_id.to_string()))?;

        let uid = self.store.resolve(task_id, text)?;
        let texts = vec![text.to_string()];
        let embeddings = self
            .embedder
            .embed(&self.options.embedding_model, &texts)
            .await?;
        let (cluster_id, (pca_x, pca_y)) = model.apply(&embeddings[0]);

        let prompts = vec![build_annotation_messages(guideline, text)];
        let (responses, cost) = self
            .chat
            .run_to_completion(&self.options.annotation_model, &prompts, 1)
            .await?;
        info!(task_id, cost, "single-example annotation complete");

        let mut record = self.assemble(text, uid, cluster_id, pca_x, pca_y, responses[0].clone());

        if record.has_edge_case_rule() {
            if let Some(semantic) = self.store.load_model(task_id, ModelPurpose::Semantic)? {
                let condition = rule::condition_clause(&record.edge_case_rule).to_string();
                let rule_embeddings = self
                    .embedder
                    .embed(&self.options.embedding_model, &[condition])
                    .await?;
                let (x, y) = semantic.pca.transform(&rule_embeddings[0]);
                record.edge_pca_x = Some(x);
                record.edge_pca_y = Some(y);
            }
        }

        Ok(record)
    }

    /// Load the task's topical model, or fit and persist one from this
    /// batch's embeddings. The lock serializes racing first-time fits.
    async fn topical_model(
        &self,
        task_id: &str,
        embeddings: &[Vec<f32>],
    ) -> Result<FittedModel, AnnotatorError> {
        let _guard = self.fit_lock.lock().await;

        if let Some(model) = self.store.load_model(task_id, ModelPurpose::Topical)? {
            return Ok(model);
        }

        let k = self.options.topical_clusters.min(embeddings.len());
        let (kmeans, _) = KMeans::fit(embeddings, k)?;
        let model = FittedModel {
            pca: Pca::fit(embeddings)?,
            clusterer: Clusterer::Plain(kmeans),
        };
        self.store
            .save_model(task_id, ModelPurpose::Topical, &model)?;
        info!(task_id, k, "fitted topical clustering model");
        Ok(model)
    }

    fn assemble(
        &self,
        text: &str,
        uid: String,
        cluster_id: usize,
        pca_x: f64,
        pca_y: f64,
        response: String,
    ) -> AnnotationRecord {
        let parsed = parse_annotation(&response);
        if let Parsed::Salvaged(_, warnings) = &parsed {
            warn!(uid = %uid, ?warnings, "annotation response salvaged");
        }
        let fields = parsed.into_fields();

        AnnotationRecord {
            text: text.to_string(),
            uid,
            cluster_id,
            pca_x,
            pca_y,
            raw_response: response,
            analysis: fields.analysis,
            label: fields.label,
            confidence: fields.confidence,
            is_new_edge_case: fields.is_new_edge_case,
            edge_case_rule: fields.edge_case_rule,
            edge_pca_x: None,
            edge_pca_y: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloss_llm::{MockChatBackend, MockEmbeddingBackend};

    const CLEAR_RESPONSE: &str = r#"{
  "analysis": "clear",
  "annotation": "0",
  "confidence": 95,
  "new_edge_case": false,
  "new_edge_case_rule": "EMPTY"
}"#;

    const EDGE_RESPONSE: &str = r#"{
  "analysis": "ambiguous",
  "annotation": "-1",
  "confidence": 40,
  "new_edge_case": true,
  "new_edge_case_rule": "When the target is unidentifiable -> refuse to classify (-1)"
}"#;

    fn engine(
        backend: MockChatBackend,
    ) -> AnnotationEngine<MockChatBackend, MockEmbeddingBackend, SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        AnnotationEngine::new(
            store.clone(),
            Arc::new(backend),
            Arc::new(MockEmbeddingBackend::new(32)),
            Arc::new(store),
            AnnotatorOptions::default(),
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_produces_one_record_per_text_in_order() {
        let engine = engine(MockChatBackend::new(CLEAR_RESPONSE));
        let texts = strings(&["first", "second", "third"]);
        let records = engine.annotate_batch("t1", &texts, "guideline").await.unwrap();

        assert_eq!(records.len(), 3);
        for (record, text) in records.iter().zip(texts.iter()) {
            assert_eq!(&record.text, text);
            assert_eq!(record.label, "0");
            assert_eq!(record.confidence, 95);
        }
    }

    #[tokio::test]
    async fn test_repeated_text_shares_uid() {
        let engine = engine(MockChatBackend::new(CLEAR_RESPONSE));
        let texts = strings(&["A", "B", "A"]);
        let records = engine.annotate_batch("t1", &texts, "g").await.unwrap();

        assert_eq!(records[0].uid, records[2].uid);
        assert_ne!(records[0].uid, records[1].uid);
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let engine = engine(MockChatBackend::new(CLEAR_RESPONSE));
        let result = engine.annotate_batch("t1", &[], "g").await;
        assert!(matches!(result, Err(AnnotatorError::EmptyBatch)));
    }

    #[tokio::test]
    async fn test_annotate_one_requires_fitted_model() {
        let engine = engine(MockChatBackend::new(CLEAR_RESPONSE));
        let result = engine.annotate_one("fresh-task", "text", "g").await;
        assert!(matches!(result, Err(AnnotatorError::ModelNotFitted(_))));
    }

    #[tokio::test]
    async fn test_topical_model_fit_once_then_reused() {
        let engine = engine(MockChatBackend::new(CLEAR_RESPONSE));
        let texts = strings(&["a", "b", "c", "d", "e"]);
        engine.annotate_batch("t1", &texts, "g").await.unwrap();

        let fitted = engine
            .store
            .load_model("t1", ModelPurpose::Topical)
            .unwrap()
            .expect("model persisted after first batch");

        // A later single-example call predicts against the same model
        let record = engine.annotate_one("t1", "a", "g").await.unwrap();
        let embedding = MockEmbeddingBackend::new(32).embed_one("a");
        assert_eq!(record.cluster_id, fitted.clusterer.predict(&embedding));
    }

    #[tokio::test]
    async fn test_annotate_one_projects_rule_when_semantic_model_exists() {
        let engine = engine(MockChatBackend::new(EDGE_RESPONSE));

        // Fit topical model via a batch
        engine
            .annotate_batch("t1", &strings(&["a", "b", "c"]), "g")
            .await
            .unwrap();

        // No semantic model yet: projection stays unset
        let before = engine.annotate_one("t1", "x", "g").await.unwrap();
        assert!(before.edge_pca_x.is_none());

        // Persist a semantic model, then the projection appears
        let data: Vec<Vec<f32>> = ["p", "q", "r"]
            .iter()
            .map(|t| MockEmbeddingBackend::new(32).embed_one(t))
            .collect();
        let (kmeans, _) = KMeans::fit(&data, 1).unwrap();
        let semantic = FittedModel {
            pca: Pca::fit(&data).unwrap(),
            clusterer: Clusterer::Plain(kmeans),
        };
        engine
            .store
            .save_model("t1", ModelPurpose::Semantic, &semantic)
            .unwrap();

        let after = engine.annotate_one("t1", "y", "g").await.unwrap();
        assert!(after.is_new_edge_case);
        assert!(after.edge_pca_x.is_some());
        assert!(after.edge_pca_y.is_some());
    }

    #[tokio::test]
    async fn test_salvaged_response_still_yields_record() {
        let engine = engine(MockChatBackend::new("not json at all"));
        let records = engine
            .annotate_batch("t1", &strings(&["a"]), "g")
            .await
            .unwrap();
        assert_eq!(records[0].label, "-1");
        assert_eq!(records[0].confidence, 50);
        assert_eq!(records[0].raw_response, "not json at all");
    }
}
