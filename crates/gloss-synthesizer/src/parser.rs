//! Parsers for the aggregation and merge responses
//!
//! Both responses come from an LLM and are untrusted. The aggregation
//! parser tries strict JSON first and falls back to a regex line scan; the
//! merge parser is a fixed line grammar with a no-merge sentinel.

use crate::prompt::NO_MERGE_SENTINEL;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::warn;

/// One category from a per-cluster aggregation response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationCategory {
    /// Category description in the `"when ... -> ..."` grammar
    pub category_description: String,
    /// 1-based rule numbers into the cluster's presented list
    pub edge_cases: Vec<usize>,
}

/// One merge suggestion from the merge response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    /// 1-based positions into the pre-merge category list
    pub indices: Vec<usize>,
    /// The merged category description
    pub merged_rule: String,
}

#[derive(Deserialize)]
struct AggregationJson {
    categories: Vec<CategoryJson>,
}

#[derive(Deserialize)]
struct CategoryJson {
    category_description: String,
    edge_cases: Vec<usize>,
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap())
}

fn description_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""?category_description"?\s*:\s*"([^"]+)""#).unwrap())
}

fn edge_cases_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""?edge_cases"?\s*:\s*\[([^\]]*)\]"#).unwrap())
}

fn int_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

fn merge_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Merge\s*\[([^\[\]]*)\]\s*:?\s*(.*)$").unwrap())
}

/// Parse an aggregation response into its categories.
///
/// Strict path: the fenced (or bare) JSON must be an object with a
/// `categories` array whose entries carry both required keys. On any
/// failure, a line scan pairs each `category_description:` line with the
/// `edge_cases: [...]` line that follows it.
pub fn parse_aggregation(response: &str) -> Vec<AggregationCategory> {
    let json_str = fence_regex()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(response)
        .trim_matches([' ', '\n']);

    match serde_json::from_str::<AggregationJson>(json_str) {
        Ok(parsed) => parsed
            .categories
            .into_iter()
            .map(|c| AggregationCategory {
                category_description: c.category_description,
                edge_cases: c.edge_cases,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "strict aggregation parse failed, trying line recovery");
            recover_categories(json_str)
        }
    }
}

fn recover_categories(text: &str) -> Vec<AggregationCategory> {
    let mut categories = Vec::new();
    let mut current_description: Option<String> = None;
    let mut current_edge_cases: Option<Vec<usize>> = None;

    for line in text.lines() {
        let line = line.trim().trim_end_matches(',');

        if let Some(captures) = description_line_regex().captures(line) {
            if let (Some(description), Some(edge_cases)) =
                (current_description.take(), current_edge_cases.take())
            {
                categories.push(AggregationCategory {
                    category_description: description,
                    edge_cases,
                });
            }
            current_description = Some(captures[1].to_string());
            current_edge_cases = None;
        }

        if let Some(captures) = edge_cases_line_regex().captures(line) {
            let numbers = int_regex()
                .find_iter(&captures[1])
                .filter_map(|m| m.as_str().parse::<usize>().ok())
                .collect();
            current_edge_cases = Some(numbers);
        }
    }

    if let (Some(description), Some(edge_cases)) = (current_description, current_edge_cases) {
        categories.push(AggregationCategory {
            category_description: description,
            edge_cases,
        });
    }

    categories
}

/// Parse a merge response.
///
/// Grammar: the literal NO MERGE sentinel means no suggestions; otherwise
/// each `Merge [n1, n2, ...]: <description>` line yields one group with
/// 1-based indices.
pub fn parse_merge(response: &str) -> Vec<MergeGroup> {
    if response.contains(NO_MERGE_SENTINEL) {
        return Vec::new();
    }

    response
        .lines()
        .filter_map(|line| {
            let captures = merge_line_regex().captures(line.trim())?;
            let indices: Vec<usize> = int_regex()
                .find_iter(&captures[1])
                .filter_map(|m| m.as_str().parse::<usize>().ok())
                .collect();
            if indices.is_empty() {
                return None;
            }
            Some(MergeGroup {
                indices,
                merged_rule: captures[2].trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_strict_json() {
        let response = r#"{
  "categories": [
    {"category_description": "when coded language targets a group -> classify 1", "edge_cases": [1, 3]},
    {"category_description": "when the target is not protected -> classify 0", "edge_cases": [2]}
  ]
}"#;
        let categories = parse_aggregation(response);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].edge_cases, vec![1, 3]);
        assert!(categories[1].category_description.contains("not protected"));
    }

    #[test]
    fn test_aggregation_fenced_json() {
        let response = "Here is my categorization:\n```json\n{\"categories\": [{\"category_description\": \"when A -> B\", \"edge_cases\": [1]}]}\n```\nDone.";
        let categories = parse_aggregation(response);
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].category_description, "when A -> B");
    }

    #[test]
    fn test_aggregation_fallback_line_recovery() {
        // Broken JSON (trailing brace missing), but the lines are scannable
        let response = r#"
"category_description": "when slurs appear without targeting -> classify 1",
"edge_cases": [1, 2]
"category_description": "when idioms are neutral -> classify 0",
"edge_cases": [3]
"#;
        let categories = parse_aggregation(response);
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].edge_cases, vec![1, 2]);
        assert_eq!(categories[1].edge_cases, vec![3]);
    }

    #[test]
    fn test_aggregation_description_without_cases_dropped() {
        let response = r#""category_description": "when orphaned -> nothing""#;
        let categories = parse_aggregation(response);
        assert!(categories.is_empty());
    }

    #[test]
    fn test_aggregation_garbage_yields_empty() {
        assert!(parse_aggregation("no structure here").is_empty());
    }

    #[test]
    fn test_merge_round_trip() {
        let response = "Merge [1, 2]: when X -> Y\nMerge [3]: when Z -> W";
        let groups = parse_merge(response);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].indices, vec![1, 2]);
        assert_eq!(groups[0].merged_rule, "when X -> Y");
        assert_eq!(groups[1].indices, vec![3]);
        assert_eq!(groups[1].merged_rule, "when Z -> W");
    }

    #[test]
    fn test_merge_no_merge_sentinel() {
        let response = "Merge Suggestions:\nNO MERGE";
        assert!(parse_merge(response).is_empty());
    }

    #[test]
    fn test_merge_ignores_prose_lines() {
        let response = "Merge Suggestions:\nMerge [2, 4]: when similar contexts recur -> merge them\nThat is all.";
        let groups = parse_merge(response);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].indices, vec![2, 4]);
    }

    #[test]
    fn test_merge_empty_brackets_skipped() {
        let response = "Merge []: when nothing -> nothing";
        assert!(parse_merge(response).is_empty());
    }

    #[test]
    fn test_merge_rule_may_contain_colon() {
        let response = "Merge [1, 2]: when A: B occurs -> classify as C";
        let groups = parse_merge(response);
        assert_eq!(groups[0].merged_rule, "when A: B occurs -> classify as C");
    }
}
