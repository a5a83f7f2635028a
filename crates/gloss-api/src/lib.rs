//! Gloss API
//!
//! Thin HTTP layer over the annotation and synthesis engines:
//!
//! - `POST /annotate` — annotate a batch of texts for a task
//! - `POST /annotate_one` — annotate a single text against fitted models
//! - `POST /cluster` — synthesize edge-case rules into categories
//! - `GET /health` — liveness check
//!
//! Request validation, response sanitization, and result snapshots live
//! here; everything else is delegated to the engine crates.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod schemas;
pub mod snapshot;

use config::ApiConfig;
use gloss_annotator::{AnnotationEngine, AnnotatorOptions};
use gloss_llm::{OpenAiChatBackend, OpenAiEmbeddingBackend};
use gloss_store::SqliteStore;
use gloss_synthesizer::{SynthesisEngine, SynthesizerOptions};
use handlers::{create_router, AppState};
use snapshot::SnapshotWriter;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Top-level service error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Storage initialization error
    #[error("Store error: {0}")]
    Store(#[from] gloss_store::StoreError),

    /// Server binding or I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Server runtime error
    #[error("Server error: {0}")]
    Server(String),
}

/// Start the API server with the given configuration
pub async fn start_server(config: ApiConfig) -> Result<(), ServerError> {
    info!("Starting Gloss API");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path);

    let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
    let store = SqliteStore::open(&config.database_path)?;
    let chat = Arc::new(OpenAiChatBackend::new(&config.api_base_url, api_key.clone()));
    let embeddings = Arc::new(OpenAiEmbeddingBackend::new(&config.api_base_url, api_key));
    let cache = Arc::new(store.clone());

    let annotator = Arc::new(AnnotationEngine::new(
        store.clone(),
        Arc::clone(&chat),
        Arc::clone(&embeddings),
        Arc::clone(&cache),
        AnnotatorOptions {
            annotation_model: config.annotation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            batch_size: config.batch_size,
            ..AnnotatorOptions::default()
        },
    ));
    let synthesizer = Arc::new(SynthesisEngine::new(
        store,
        chat,
        embeddings,
        cache,
        SynthesizerOptions {
            aggregation_model: config.aggregation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            batch_size: config.batch_size,
            ..SynthesizerOptions::default()
        },
    ));

    let state = AppState {
        annotator,
        synthesizer,
        snapshots: Arc::new(SnapshotWriter::new(&config.results_dir)?),
    };

    let app = create_router(state);
    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("API listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
