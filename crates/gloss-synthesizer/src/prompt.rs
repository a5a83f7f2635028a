//! Aggregation and merge prompt templates
//!
//! Both templates pin the response grammar the parsers in this crate rely
//! on: a JSON `categories` object for aggregation, and `Merge [..]: ...`
//! lines (or the NO MERGE sentinel) for the merge phase.

use gloss_domain::ChatMessage;

/// Literal the merge response uses to signal "nothing to merge"
pub const NO_MERGE_SENTINEL: &str = "NO MERGE";

const AGGREGATION_TEMPLATE: &str = r#"I am annotating the following task:

<annotation_guideline>
{guideline}
</annotation_guideline>

While annotating, I encountered these edge cases that are not clearly addressed in the guideline:
<edge_cases>
{edge_cases}
</edge_cases>
Each edge case is numbered with <Edge Case Numbers> (e.g., 1, 2, 3, ...), and follows the format:
"when <condition> -> <action>",
where <condition> describes the edge case and <action> states how to handle it.

Your task:
Create a set of high-level categories that cover all the edge cases above.

Requirements:
1. Every edge case must be assigned to a category - no exceptions.
2. The categories should summarize the edge cases in a high-level, avoid too many categories.
3. Iteratively refine your category list: If a category overgeneralizes, split it. If two categories overlap significantly, merge them.
4. In your response, category descriptions MUST be in the format of "when <summarized condition> -> <generalized action>", starting with "when" and with condition and action connected by "->".

Please reply in the following JSON format:
```json
{
  "categories": [
    {
      "category_description": "when <summarized condition> -> <generalized action>",
      "edge_cases": [<Edge Case Numbers, e.g., 1, 5, 6>]
    },
    {
      "category_description": "when <summarized condition> -> <generalized action>",
      "edge_cases": [<Edge Case Numbers>]
    }
    // ... more categories as needed
  ]
}
```
"#;

const MERGE_TEMPLATE: &str = r#"I am annotating the following task:

<annotation_guideline>
{guideline}
</annotation_guideline>

While annotating, I encountered these edge cases that are not clearly addressed in the guideline:
<edge_cases>
{edge_cases}
</edge_cases>
Each edge case is numbered with <Edge Case Numbers> (e.g., 1, 2, 3, ...), and follows the format:
"when <condition> -> <action>",
where <condition> describes the edge case and <action> states how to handle it.

Your task:
If there are edge cases that describe VERY similar situations, merge them by grouping the relevant edge case numbers together.

Requirement:
1. Only merge very similar cases.
2. Iteratively refine your category list: If a category overgeneralizes, split it.


Please respond in the following format:
<format>
Merge Suggestions:
Merge [list 1 of edge case numbers]: when <merged condition> -> <merged action>
Merge [list 2 of edge case numbers]: when <merged condition> -> <merged action>
...
</format>

If there is no merge suggestion, write NO MERGE after "Merge Suggestions:"."#;

/// Number items 1-based, one per line, for the `<edge_cases>` block
pub fn numbered_list(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the per-cluster aggregation prompt
pub fn build_aggregation_messages(guideline: &str, rules: &[String]) -> Vec<ChatMessage> {
    let content = AGGREGATION_TEMPLATE
        .replace("{guideline}", guideline)
        .replace("{edge_cases}", &numbered_list(rules));
    vec![ChatMessage::user(content)]
}

/// Build the cross-cluster merge prompt over category descriptions
pub fn build_merge_messages(guideline: &str, categories: &[String]) -> Vec<ChatMessage> {
    let content = MERGE_TEMPLATE
        .replace("{guideline}", guideline)
        .replace("{edge_cases}", &numbered_list(categories));
    vec![ChatMessage::user(content)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_list_is_one_based() {
        let items = vec!["first".to_string(), "second".to_string()];
        assert_eq!(numbered_list(&items), "1. first\n2. second");
    }

    #[test]
    fn test_aggregation_prompt_contains_rules_and_contract() {
        let rules = vec!["when A -> B".to_string()];
        let messages = build_aggregation_messages("the guideline", &rules);
        let content = &messages[0].content;
        assert!(content.contains("the guideline"));
        assert!(content.contains("1. when A -> B"));
        assert!(content.contains("\"categories\""));
        assert!(content.contains("\"category_description\""));
        assert!(content.contains("\"edge_cases\""));
    }

    #[test]
    fn test_merge_prompt_names_the_sentinel() {
        let messages = build_merge_messages("g", &["when A -> B".to_string()]);
        assert!(messages[0].content.contains("NO MERGE"));
        assert!(messages[0].content.contains("Merge ["));
    }
}
