//! HTTP request handlers
//!
//! Thin glue: validate the payload, call the engine, sanitize and snapshot
//! the result. All pipeline logic lives in gloss-annotator and
//! gloss-synthesizer.

use crate::schemas::{
    round_suffix, AnnotateRequest, AnnotateResponse, ClusterRequest, ClusterResponse,
    HealthResponse,
};
use crate::snapshot::{sanitize, SnapshotWriter};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use gloss_annotator::{AnnotationEngine, AnnotatorError};
use gloss_domain::{ChatBackend, EmbeddingBackend, ResponseCache};
use gloss_synthesizer::SynthesisEngine;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

/// Shared application state
pub struct AppState<B, E, C>
where
    B: ChatBackend,
    E: EmbeddingBackend,
    C: ResponseCache,
{
    /// Annotation engine
    pub annotator: Arc<AnnotationEngine<B, E, C>>,
    /// Synthesis engine
    pub synthesizer: Arc<SynthesisEngine<B, E, C>>,
    /// Result snapshot writer
    pub snapshots: Arc<SnapshotWriter>,
}

impl<B, E, C> Clone for AppState<B, E, C>
where
    B: ChatBackend,
    E: EmbeddingBackend,
    C: ResponseCache,
{
    fn clone(&self) -> Self {
        Self {
            annotator: Arc::clone(&self.annotator),
            synthesizer: Arc::clone(&self.synthesizer),
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application-level handler error
#[derive(Debug)]
pub enum AppError {
    /// Invalid request payload; nothing was persisted
    Validation(String),
    /// A prerequisite is missing (no fitted model for the task)
    MissingPrerequisite(String),
    /// Internal failure
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MissingPrerequisite(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<AnnotatorError> for AppError {
    fn from(e: AnnotatorError) -> Self {
        match e {
            AnnotatorError::ModelNotFitted(_) => AppError::MissingPrerequisite(e.to_string()),
            AnnotatorError::EmptyBatch => AppError::Validation(e.to_string()),
            other => {
                error!(error = %other, "annotation failed");
                AppError::Internal(other.to_string())
            }
        }
    }
}

/// Build the service router
pub fn create_router<B, E, C>(state: AppState<B, E, C>) -> Router
where
    B: ChatBackend + 'static,
    E: EmbeddingBackend + 'static,
    C: ResponseCache + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/annotate", post(annotate::<B, E, C>))
        .route("/annotate_one", post(annotate_one::<B, E, C>))
        .route("/cluster", post(cluster::<B, E, C>))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

fn validate_task_id(task_id: &str) -> Result<(), AppError> {
    if task_id.trim().is_empty() {
        return Err(AppError::Validation("Task ID is required.".to_string()));
    }
    Ok(())
}

async fn annotate<B, E, C>(
    State(state): State<AppState<B, E, C>>,
    Json(request): Json<AnnotateRequest>,
) -> Result<Json<serde_json::Value>, AppError>
where
    B: ChatBackend + 'static,
    E: EmbeddingBackend + 'static,
    C: ResponseCache + 'static,
{
    if request.examples.is_empty() {
        return Err(AppError::Validation("Empty input.".to_string()));
    }
    validate_task_id(&request.task_id)?;

    let records = state
        .annotator
        .annotate_batch(&request.task_id, &request.examples, &request.annotation_guideline)
        .await?;

    respond_with_snapshot(
        &state.snapshots,
        "annotation",
        &request.task_id,
        request.reannotate_round,
        AnnotateResponse {
            annotations: records,
        },
    )
}

async fn annotate_one<B, E, C>(
    State(state): State<AppState<B, E, C>>,
    Json(request): Json<AnnotateRequest>,
) -> Result<Json<serde_json::Value>, AppError>
where
    B: ChatBackend + 'static,
    E: EmbeddingBackend + 'static,
    C: ResponseCache + 'static,
{
    if request.examples.len() != 1 {
        return Err(AppError::Validation(
            "Must provide exactly one example.".to_string(),
        ));
    }
    validate_task_id(&request.task_id)?;

    let record = state
        .annotator
        .annotate_one(&request.task_id, &request.examples[0], &request.annotation_guideline)
        .await?;

    respond_with_snapshot(
        &state.snapshots,
        "annotation",
        &request.task_id,
        request.reannotate_round,
        AnnotateResponse {
            annotations: vec![record],
        },
    )
}

async fn cluster<B, E, C>(
    State(state): State<AppState<B, E, C>>,
    Json(request): Json<ClusterRequest>,
) -> Result<Json<serde_json::Value>, AppError>
where
    B: ChatBackend + 'static,
    E: EmbeddingBackend + 'static,
    C: ResponseCache + 'static,
{
    validate_task_id(&request.task_id)?;
    if request.annotation_guideline.trim().is_empty() {
        return Err(AppError::Validation(
            "Annotation guideline is required.".to_string(),
        ));
    }

    let result = state
        .synthesizer
        .synthesize(&request.task_id, &request.annotation_result, &request.annotation_guideline)
        .await
        .map_err(|e| {
            error!(error = %e, "synthesis failed");
            AppError::Internal(e.to_string())
        })?;

    respond_with_snapshot(
        &state.snapshots,
        "cluster",
        &request.task_id,
        request.reannotate_round,
        ClusterResponse::from(result),
    )
}

/// Serialize, sanitize non-finite floats, snapshot, and respond
fn respond_with_snapshot<T: Serialize>(
    snapshots: &SnapshotWriter,
    kind: &str,
    task_id: &str,
    round: Option<u32>,
    payload: T,
) -> Result<Json<serde_json::Value>, AppError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| AppError::Internal(format!("serialization: {}", e)))?;
    let value = sanitize(value);

    if let Err(e) = snapshots.write(kind, task_id, &round_suffix(round), &value) {
        warn!(error = %e, "failed to write result snapshot");
    }

    Ok(Json(value))
}
