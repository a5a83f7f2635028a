//! Annotation records - one LLM judgment per example

use serde::{Deserialize, Serialize};

/// Sentinel meaning "no edge-case rule applies" in annotator output.
/// Comparison is case-insensitive on read.
pub const EDGE_CASE_EMPTY: &str = "EMPTY";

/// Sentinel label for examples the annotator could not classify
pub const UNCLASSIFIABLE_LABEL: &str = "-1";

/// One LLM judgment for an example.
///
/// Records are immutable once produced; re-annotation appends new records
/// rather than mutating old ones. Field names on the wire match the result
/// schema consumed by the synthesis round
/// (`text_to_annotate`, `cluster`, `raw_annotations`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// The annotated text
    #[serde(rename = "text_to_annotate")]
    pub text: String,

    /// Stable per-task uid for the text
    pub uid: String,

    /// Coarse topical cluster assignment
    #[serde(rename = "cluster")]
    pub cluster_id: usize,

    /// 2-D projection of the text embedding, x coordinate
    pub pca_x: f64,

    /// 2-D projection of the text embedding, y coordinate
    pub pca_y: f64,

    /// Raw LLM response text, kept for auditability
    #[serde(rename = "raw_annotations")]
    pub raw_response: String,

    /// The model's step-by-step reasoning
    #[serde(rename = "analyses")]
    pub analysis: String,

    /// Application-defined label; `"-1"` when unclassifiable
    #[serde(rename = "annotation")]
    pub label: String,

    /// Annotation confidence on a 0-100 integer scale
    pub confidence: u8,

    /// Whether the annotator flagged this example as a new edge case
    #[serde(rename = "new_edge_case")]
    pub is_new_edge_case: bool,

    /// Proposed rule in `"when <condition> -> <action>"` form, or the
    /// EMPTY sentinel. Meaningful only when `is_new_edge_case` is true.
    #[serde(rename = "guideline_improvement")]
    pub edge_case_rule: String,

    /// Projection of the rule condition into the semantic (rule) space.
    /// Set only by single-example annotation when a semantic model exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_pca_x: Option<f64>,

    /// y coordinate of the semantic-space projection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_pca_y: Option<f64>,
}

impl AnnotationRecord {
    /// Whether this record carries a usable edge-case rule
    /// (flagged as a new edge case and not the EMPTY sentinel).
    pub fn has_edge_case_rule(&self) -> bool {
        self.is_new_edge_case && !is_empty_sentinel(&self.edge_case_rule)
    }
}

/// Whether a rule string is the EMPTY sentinel (case-insensitive, trimmed)
pub fn is_empty_sentinel(rule: &str) -> bool {
    let trimmed = rule.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(EDGE_CASE_EMPTY)
}
