//! OpenAI-compatible provider backends
//!
//! Chat completions and embeddings over any OpenAI-compatible HTTP API
//! (OpenAI itself, DeepSeek, or a proxy). Transient failures are not retried
//! here: the batched client's failed-batch loop owns retry semantics, and
//! request timeouts are left to provider defaults.

use crate::models;
use gloss_domain::{ChatBackend, ChatMessage, Completion, EmbeddingBackend, GenerationArgs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors from the OpenAI-compatible backends
#[derive(Error, Debug)]
pub enum OpenAiError {
    /// Network or transport failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the API
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// Response arrived but had no usable content
    #[error("Empty or malformed response: {0}")]
    InvalidResponse(String),

    /// Model alias missing from the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    /// Reasoning trace, exposed by reasoning models (DeepSeek-R1 style)
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// Chat backend over an OpenAI-compatible completions API
pub struct OpenAiChatBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiChatBackend {
    /// Create a backend against the given base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a backend against the default OpenAI endpoint
    pub fn default_endpoint(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiChatBackend {
    type Error = OpenAiError;

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        args: &GenerationArgs,
    ) -> Result<Completion, OpenAiError> {
        let info =
            models::resolve(model).ok_or_else(|| OpenAiError::UnknownModel(model.to_string()))?;

        let body = ChatRequest {
            model: info.provider_id,
            messages,
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            seed: args.seed,
            top_p: args.top_p,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAiError::InvalidResponse("no choices".to_string()))?;

        let content = choice
            .message
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OpenAiError::InvalidResponse("empty content".to_string()))?;

        let usage = parsed.usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        Ok(Completion {
            content,
            reasoning: choice.message.reasoning_content,
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Embedding backend over an OpenAI-compatible embeddings API
pub struct OpenAiEmbeddingBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiEmbeddingBackend {
    /// Create a backend against the given base URL
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a backend against the default OpenAI endpoint
    pub fn default_endpoint(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for OpenAiEmbeddingBackend {
    type Error = OpenAiError;

    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, OpenAiError> {
        let request = EmbeddingRequest {
            model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(OpenAiError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
