//! Deterministic mock backends for testing

use gloss_domain::{ChatBackend, ChatMessage, Completion, EmbeddingBackend, GenerationArgs};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Error type shared by the mock backends
#[derive(Error, Debug)]
pub enum MockError {
    /// Injected failure
    #[error("Mock error: {0}")]
    Injected(String),
}

/// Mock chat backend returning pre-configured responses without network
/// calls.
///
/// Responses are keyed on the last user message's content; unmatched
/// prompts get the default response. Specific prompts can be configured to
/// fail, and failures can be made one-shot so retries succeed.
///
/// # Examples
///
/// ```
/// use gloss_llm::MockChatBackend;
/// use gloss_domain::{ChatBackend, ChatMessage, GenerationArgs};
///
/// # tokio_test::block_on(async {
/// let mut backend = MockChatBackend::new("default");
/// backend.add_response("prompt1", "response1");
///
/// let msgs = [ChatMessage::user("prompt1")];
/// let out = backend.complete("gpt-4.1", &msgs, &GenerationArgs::default()).await.unwrap();
/// assert_eq!(out.content, "response1");
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockChatBackend {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    failures: Arc<Mutex<HashMap<String, usize>>>,
    call_count: Arc<Mutex<usize>>,
    input_tokens: u64,
    output_tokens: u64,
}

impl MockChatBackend {
    /// Create a mock with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
            input_tokens: 100,
            output_tokens: 50,
        }
    }

    /// Override the token counts reported per completion
    pub fn with_token_counts(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    /// Add a specific response for a given user-message content
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), response.into());
    }

    /// Make the given prompt fail `times` times before succeeding
    pub fn fail_times(&mut self, prompt: impl Into<String>, times: usize) {
        self.failures.lock().unwrap().insert(prompt.into(), times);
    }

    /// Number of completed `complete` calls (including failures)
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ChatBackend for MockChatBackend {
    type Error = MockError;

    async fn complete(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _args: &GenerationArgs,
    ) -> Result<Completion, MockError> {
        *self.call_count.lock().unwrap() += 1;

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&prompt) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(MockError::Injected(format!("injected failure for {:?}", prompt)));
                }
            }
        }

        let content = self
            .responses
            .lock()
            .unwrap()
            .get(&prompt)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone());

        Ok(Completion {
            content,
            reasoning: None,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        })
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

/// Mock embedding backend producing hash-based deterministic vectors.
///
/// The embeddings are:
/// - **Deterministic**: same text always produces the same vector
/// - **Normalized**: unit length, so distances behave
/// - **Diverse**: different texts produce different vectors
#[derive(Debug, Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    call_count: Arc<Mutex<usize>>,
}

impl MockEmbeddingBackend {
    /// Create a mock embedding model with the given output dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of backend batch calls made
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let hash_value = hasher.finish();

        // Map the hash into [-1, 1]
        let normalized = (hash_value as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }

    /// Deterministic unit vector for one text
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v: Vec<f32> = (0..self.dimension)
            .map(|i| Self::hash_with_seed(text, i as u64))
            .collect();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    type Error = MockError;

    async fn embed(&self, _model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, MockError> {
        *self.call_count.lock().unwrap() += 1;
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
