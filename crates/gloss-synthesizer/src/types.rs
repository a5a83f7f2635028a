//! Input and output types for synthesis

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One annotated record entering synthesis.
///
/// Only `uid`, `guideline_improvement`, and `confidence` are required; the
/// rest is passed through to the enriched output when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRecord {
    /// Stable per-task uid
    pub uid: String,

    /// The proposed edge-case rule, or the EMPTY sentinel
    pub guideline_improvement: String,

    /// Annotation confidence, 0-100
    pub confidence: u8,

    /// The annotated text, when the caller carries it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_to_annotate: Option<String>,

    /// The assigned label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    /// The model's reasoning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyses: Option<String>,

    /// Raw LLM response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_annotations: Option<String>,
}

/// One record of the enriched per-example output listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementRecord {
    /// Stable per-task uid
    pub uid: String,

    /// Dense category id, absent when the LLM never assigned this rule
    pub edge_case_id: Option<usize>,

    /// Projection of the rule condition in the semantic space
    pub pca_x: f64,

    /// y coordinate of the semantic-space projection
    pub pca_y: f64,

    /// Annotation confidence, 0-100
    pub confidence: u8,

    /// The consolidated category description this record was folded into
    pub guideline_improvement: Option<String>,

    /// The record's original rule, before consolidation
    pub low_level_guideline_improvement: String,

    /// The annotated text, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_to_annotate: Option<String>,

    /// The assigned label, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    /// The model's reasoning, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyses: Option<String>,

    /// Raw LLM response, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_annotations: Option<String>,
}

/// The synthesis outcome: consolidated category suggestions plus the
/// enriched per-record listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisResult {
    /// `edge_case_{id}` → consolidated rule description
    pub suggestions: BTreeMap<String, String>,

    /// Per-record category assignment, in filtered-input order
    pub improvement_clusters: Vec<ImprovementRecord>,

    /// Rules the LLM never assigned to any category. Reported rather than
    /// silently dropped.
    pub dropped_rules: usize,
}

/// Tunables for the synthesis engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerOptions {
    /// Model alias used for the aggregation and merge phases
    pub aggregation_model: String,

    /// Model used for rule-condition embeddings
    pub embedding_model: String,

    /// Completion batch size
    pub batch_size: usize,

    /// Target number of rules per semantic cluster (drives K = N/target + 1)
    pub rules_per_cluster: usize,
}

impl Default for SynthesizerOptions {
    fn default() -> Self {
        Self {
            aggregation_model: "deepseek-reasoner".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            batch_size: 20,
            rules_per_cluster: 15,
        }
    }
}

impl SynthesizerOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<(), String> {
        if self.aggregation_model.is_empty() {
            return Err("aggregation_model must not be empty".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.rules_per_cluster == 0 {
            return Err("rules_per_cluster must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        assert!(SynthesizerOptions::default().validate().is_ok());
    }

    #[test]
    fn test_synthesis_record_tolerates_minimal_payload() {
        let record: SynthesisRecord = serde_json::from_str(
            r#"{"uid": "u1", "guideline_improvement": "when X -> Y", "confidence": 60}"#,
        )
        .unwrap();
        assert_eq!(record.uid, "u1");
        assert!(record.text_to_annotate.is_none());
    }

    #[test]
    fn test_unassigned_record_serializes_null_id() {
        let record = ImprovementRecord {
            uid: "u1".to_string(),
            edge_case_id: None,
            pca_x: 0.0,
            pca_y: 0.0,
            confidence: 50,
            guideline_improvement: None,
            low_level_guideline_improvement: "when X -> Y".to_string(),
            text_to_annotate: None,
            annotation: None,
            analyses: None,
            raw_annotations: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["edge_case_id"].is_null());
        assert!(json["guideline_improvement"].is_null());
    }
}
