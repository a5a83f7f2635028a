//! Request and response schemas for the HTTP boundary
//!
//! Payloads are typed and validated here rather than deferred into
//! downstream processing: malformed shapes are rejected with a structured
//! error before any state is touched.

use gloss_domain::AnnotationRecord;
use gloss_synthesizer::{SynthesisRecord, SynthesisResult};
use serde::{Deserialize, Serialize};

/// Request for `/annotate` and `/annotate_one`
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotateRequest {
    /// Texts to annotate
    pub examples: Vec<String>,

    /// The natural-language annotation guideline
    pub annotation_guideline: String,

    /// Task identifier scoping uids and models
    pub task_id: String,

    /// Optional re-annotation round, reflected in snapshot filenames
    #[serde(default)]
    pub reannotate_round: Option<u32>,
}

/// Request for `/cluster`
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterRequest {
    /// Annotated records to synthesize over. Each record must carry at
    /// minimum `uid`, `guideline_improvement`, and `confidence`.
    pub annotation_result: Vec<SynthesisRecord>,

    /// The natural-language annotation guideline
    pub annotation_guideline: String,

    /// Task identifier scoping uids and models
    pub task_id: String,

    /// Optional re-annotation round, reflected in snapshot filenames
    #[serde(default)]
    pub reannotate_round: Option<u32>,
}

/// Response for the annotation endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnotateResponse {
    /// One record per input example, in input order
    pub annotations: Vec<AnnotationRecord>,
}

/// Response for `/cluster`
#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterResponse {
    /// `edge_case_{id}` → consolidated rule description
    pub suggestions: std::collections::BTreeMap<String, String>,

    /// Per-record category assignment
    pub improvement_clusters: Vec<gloss_synthesizer::ImprovementRecord>,

    /// Rules no category claimed
    pub dropped_rules: usize,
}

impl From<SynthesisResult> for ClusterResponse {
    fn from(result: SynthesisResult) -> Self {
        Self {
            suggestions: result.suggestions,
            improvement_clusters: result.improvement_clusters,
            dropped_rules: result.dropped_rules,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status
    pub status: String,
}

/// Snapshot filename suffix for a re-annotation round
pub fn round_suffix(round: Option<u32>) -> String {
    match round {
        Some(round) => format!("_{}", round),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_request_deserializes() {
        let request: AnnotateRequest = serde_json::from_str(
            r#"{"examples": ["a"], "annotation_guideline": "g", "task_id": "t1"}"#,
        )
        .unwrap();
        assert_eq!(request.examples, vec!["a"]);
        assert!(request.reannotate_round.is_none());
    }

    #[test]
    fn test_cluster_request_requires_record_fields() {
        // A record missing `uid` is an invalid shape
        let result: Result<ClusterRequest, _> = serde_json::from_str(
            r#"{
                "annotation_result": [{"guideline_improvement": "x", "confidence": 50}],
                "annotation_guideline": "g",
                "task_id": "t1"
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_round_suffix() {
        assert_eq!(round_suffix(None), "");
        assert_eq!(round_suffix(Some(2)), "_2");
    }
}
