//! Annotation response parsing: strict JSON first, salvage scan second
//!
//! LLM output is untrusted free text that frequently violates the requested
//! JSON contract, so parsing is a two-stage pipeline: a strict path that
//! demands all five fields, and a line-scanning salvage path that never
//! fails and fills unrecoverable fields with neutral defaults.

use gloss_domain::{EDGE_CASE_EMPTY, UNCLASSIFIABLE_LABEL};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Default confidence when none can be recovered
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// The five parsed fields of an annotation response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnnotation {
    /// The model's reasoning
    pub analysis: String,
    /// Final label; `"-1"` when unclassifiable
    pub label: String,
    /// Confidence clamped to 0-100
    pub confidence: u8,
    /// Whether the model flagged a new edge case
    pub is_new_edge_case: bool,
    /// Proposed rule or the EMPTY sentinel
    pub edge_case_rule: String,
}

/// Result of parsing: the strict path, or the salvage path with a note of
/// everything that had to be defaulted or scraped.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// The response satisfied the JSON contract
    Strict(ParsedAnnotation),
    /// The response was malformed; fields were recovered by line scanning
    Salvaged(ParsedAnnotation, Vec<String>),
}

impl Parsed {
    /// The parsed fields, regardless of which path produced them
    pub fn fields(&self) -> &ParsedAnnotation {
        match self {
            Parsed::Strict(f) => f,
            Parsed::Salvaged(f, _) => f,
        }
    }

    /// Consume into the parsed fields
    pub fn into_fields(self) -> ParsedAnnotation {
        match self {
            Parsed::Strict(f) => f,
            Parsed::Salvaged(f, _) => f,
        }
    }
}

/// Parse an annotation response. Never fails: if the strict path can't
/// satisfy the five-field contract, the salvage path produces a complete
/// (possibly degraded) record.
pub fn parse_annotation(response: &str) -> Parsed {
    let cleaned = strip_wrappers(response);
    match parse_strict(&cleaned) {
        Ok(fields) => Parsed::Strict(fields),
        Err(_) => {
            let (fields, warnings) = salvage(&cleaned);
            Parsed::Salvaged(fields, warnings)
        }
    }
}

/// Remove code fences and any thinking preamble before the closing marker
fn strip_wrappers(response: &str) -> String {
    let without_fences = response.replace("```json", "").replace("```", "");
    let trimmed = without_fences.trim_matches(['\n', ' ']);
    match trimmed.split_once("</think>") {
        Some((_, after)) => after.trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn parse_strict(cleaned: &str) -> Result<ParsedAnnotation, String> {
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;
    let obj = value.as_object().ok_or("response is not a JSON object")?;

    // All five fields are required; absence of any is a parse failure.
    let analysis = field_as_string(obj.get("analysis").ok_or("missing analysis")?);
    let label = field_as_string(obj.get("annotation").ok_or("missing annotation")?);
    let confidence =
        number_as_confidence(obj.get("confidence").ok_or("missing confidence")?)
            .ok_or("confidence is not numeric")?;
    let is_new_edge_case =
        value_as_bool(obj.get("new_edge_case").ok_or("missing new_edge_case")?)
            .ok_or("new_edge_case is not boolean")?;
    let edge_case_rule =
        field_as_string(obj.get("new_edge_case_rule").ok_or("missing new_edge_case_rule")?);

    Ok(ParsedAnnotation {
        analysis,
        label,
        confidence,
        is_new_edge_case,
        edge_case_rule,
    })
}

fn field_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn number_as_confidence(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn confidence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.?\d*").unwrap())
}

/// Last line of defense: recover field values by scanning lines for
/// field-name substrings, defaulting whatever cannot be found.
fn salvage(cleaned: &str) -> (ParsedAnnotation, Vec<String>) {
    let mut warnings = vec!["strict JSON parse failed".to_string()];

    // Analysis: the text between the first `: "` and the "annotation" key
    let analysis = cleaned
        .split_once(": \"")
        .map(|(_, after)| after)
        .unwrap_or(cleaned)
        .split("\"annotation\"")
        .next()
        .unwrap_or("")
        .trim_matches([' ', '\n', '"', '\'', ','])
        .to_string();

    let mut label: Option<String> = None;
    let mut confidence: Option<u8> = None;
    let mut is_new_edge_case: Option<bool> = None;
    let mut edge_case_rule: Option<String> = None;

    for line in cleaned.lines() {
        if line.contains("new_edge_case_rule") {
            edge_case_rule = Some(tail_value(line));
        } else if line.contains("new_edge_case") {
            is_new_edge_case = Some(line.to_ascii_lowercase().contains("true"));
        } else if line.contains("annotation") {
            label = Some(tail_value(line));
        } else if line.contains("confidence") {
            if let Some(m) = confidence_regex().find(line) {
                if let Ok(score) = m.as_str().parse::<f64>() {
                    confidence = Some(score.round().clamp(0.0, 100.0) as u8);
                }
            }
        }
    }

    if label.is_none() {
        warnings.push("annotation not recovered; defaulting to unclassifiable".to_string());
    }
    if confidence.is_none() {
        warnings.push(format!("confidence not recovered; defaulting to {}", DEFAULT_CONFIDENCE));
    }
    if is_new_edge_case.is_none() {
        warnings.push("new_edge_case not recovered; defaulting to false".to_string());
    }
    if edge_case_rule.is_none() {
        warnings.push("new_edge_case_rule not recovered; defaulting to EMPTY".to_string());
    }

    (
        ParsedAnnotation {
            analysis,
            label: label.unwrap_or_else(|| UNCLASSIFIABLE_LABEL.to_string()),
            confidence: confidence.unwrap_or(DEFAULT_CONFIDENCE),
            is_new_edge_case: is_new_edge_case.unwrap_or(false),
            edge_case_rule: edge_case_rule.unwrap_or_else(|| EDGE_CASE_EMPTY.to_string()),
        },
        warnings,
    )
}

/// The value part of a `key: value` line, stripped of quoting noise
fn tail_value(line: &str) -> String {
    line.rsplit(':')
        .next()
        .unwrap_or("")
        .trim_matches([' ', '\n', '"', '\'', ','])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
  "analysis": "The post contains a slur targeting a protected group.",
  "annotation": "1",
  "confidence": 92,
  "new_edge_case": false,
  "new_edge_case_rule": "EMPTY"
}"#;

    #[test]
    fn test_well_formed_json_parses_strictly() {
        let parsed = parse_annotation(WELL_FORMED);
        let Parsed::Strict(fields) = parsed else {
            panic!("expected strict parse");
        };
        assert_eq!(fields.label, "1");
        assert_eq!(fields.confidence, 92);
        assert!(!fields.is_new_edge_case);
        assert_eq!(fields.edge_case_rule, "EMPTY");
        assert!(fields.analysis.contains("slur"));
    }

    #[test]
    fn test_fenced_json_parses_strictly() {
        let response = format!("```json\n{}\n```", WELL_FORMED);
        assert!(matches!(parse_annotation(&response), Parsed::Strict(_)));
    }

    #[test]
    fn test_thinking_preamble_is_ignored() {
        let response = format!(
            "Let me reason about this step by step...\n</think>\n{}",
            WELL_FORMED
        );
        let parsed = parse_annotation(&response);
        assert!(matches!(parsed, Parsed::Strict(_)));
        assert_eq!(parsed.fields().confidence, 92);
    }

    #[test]
    fn test_numeric_annotation_value_accepted() {
        let response = r#"{
  "analysis": "clear case",
  "annotation": 0,
  "confidence": 88.0,
  "new_edge_case": false,
  "new_edge_case_rule": "EMPTY"
}"#;
        let parsed = parse_annotation(response);
        let fields = parsed.fields();
        assert_eq!(fields.label, "0");
        assert_eq!(fields.confidence, 88);
    }

    #[test]
    fn test_stringly_typed_fields_accepted() {
        let response = r#"{
  "analysis": "a",
  "annotation": "-1",
  "confidence": "75",
  "new_edge_case": "True",
  "new_edge_case_rule": "When coded language implies a target -> classify 1"
}"#;
        let parsed = parse_annotation(response);
        let fields = parsed.fields();
        assert_eq!(fields.confidence, 75);
        assert!(fields.is_new_edge_case);
    }

    #[test]
    fn test_missing_field_falls_back_to_salvage() {
        // No new_edge_case_rule key
        let response = r#"{
  "analysis": "a",
  "annotation": "1",
  "confidence": 90,
  "new_edge_case": false
}"#;
        let parsed = parse_annotation(response);
        let Parsed::Salvaged(fields, warnings) = parsed else {
            panic!("expected salvage");
        };
        assert_eq!(fields.label, "1");
        assert_eq!(fields.confidence, 90);
        assert_eq!(fields.edge_case_rule, "EMPTY");
        assert!(!warnings.is_empty());
    }

    #[test]
    fn test_loose_text_lines_salvaged() {
        let response = r#"Here is my assessment:
"analysis": "The text is ambiguous about the target group",
"annotation": -1,
"confidence": around 60 or so,
"new_edge_case": true,
"new_edge_case_rule": When the target group is unidentifiable -> refuse to classify (-1)
"#;
        let parsed = parse_annotation(response);
        let Parsed::Salvaged(fields, _) = parsed else {
            panic!("expected salvage");
        };
        assert_eq!(fields.label, "-1");
        assert_eq!(fields.confidence, 60);
        assert!(fields.is_new_edge_case);
        assert!(fields.edge_case_rule.contains("refuse to classify"));
    }

    #[test]
    fn test_salvage_never_fails_on_garbage() {
        let parsed = parse_annotation("complete nonsense with no structure at all");
        let Parsed::Salvaged(fields, warnings) = parsed else {
            panic!("expected salvage");
        };
        assert_eq!(fields.label, UNCLASSIFIABLE_LABEL);
        assert_eq!(fields.confidence, DEFAULT_CONFIDENCE);
        assert!(!fields.is_new_edge_case);
        assert_eq!(fields.edge_case_rule, EDGE_CASE_EMPTY);
        assert!(warnings.len() >= 4);
    }

    #[test]
    fn test_salvage_on_empty_input() {
        let parsed = parse_annotation("");
        let fields = parsed.into_fields();
        assert_eq!(fields.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(fields.label, UNCLASSIFIABLE_LABEL);
    }

    #[test]
    fn test_confidence_clamped_to_scale() {
        let response = r#"{
  "analysis": "a",
  "annotation": "1",
  "confidence": 250,
  "new_edge_case": false,
  "new_edge_case_rule": "EMPTY"
}"#;
        assert_eq!(parse_annotation(response).fields().confidence, 100);
    }

    #[test]
    fn test_rule_line_not_confused_with_flag_line() {
        // The rule substring contains "new_edge_case"; the scanner must
        // treat the rule line as the rule, not the boolean.
        let response = "\"new_edge_case\": false\n\"new_edge_case_rule\": \"EMPTY\"\n";
        let parsed = parse_annotation(response);
        let fields = parsed.fields();
        assert!(!fields.is_new_edge_case);
        assert_eq!(fields.edge_case_rule, "EMPTY");
    }
}
