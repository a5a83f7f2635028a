//! Annotation prompt engineering
//!
//! The template's structure is load-bearing: the response contract names the
//! five JSON keys the parser requires, and the rule format feeds the
//! downstream clustering grammar (`"When <condition> -> <action>"`).

use gloss_domain::ChatMessage;

/// System role for every annotation call
pub const SYSTEM_PROMPT: &str = "You are an expert annotator. Your task is to analyze text samples according to specific guidelines and handle edge cases systematically.";

const ANNOTATION_TEMPLATE: &str = r#"Here is the annotation task:
<annotation_guideline>
{guideline}
</annotation_guideline>

Required Workflow:
1. Granular Analysis:
Systematically evaluate the text against EVERY criterion in the guidelines. For each requirement:
    - State the specific guideline component being checked
    - Explicitly state whether it is satisfied/not satisfied
    - Cite relevant text evidence

2. Annotation: Combine your analysis to determine the final label. If you feel it is unclassifiable given the guidelines and defined labels, feel free to annotate -1.

3. Confidence Assessment:
Rate your annotation confidence from 0-100. If the sample is ambiguous to annotate given the annotation guideline, and no edge case handling strategy is mentioned, give a low confidence score. If the sample exhibits clear evidence according to the guideline or there is applicable edge case handling rule, give a high confidence score.

4. New Edge Case or Not:
The case is a new edge case if:
   - Confidence <= 75 or annotation = -1; AND
   - It is not covered by existing edge case handling rules. (If classifying -1 following an existing edge case handling rule or guideline, it is not a new edge case)

5. New Edge Case Rule:
If it is a new edge case:
Propose a generalizable edge case rule, **sticking** to the format: "When <observable condition> -> <action>"
The <observable condition> should not be too specific to be **GENERALIZABLE**, and properly describe the current edge case.
Examples:
- "When X and Y co-occur but Z is absent -> classify as xxx"
- "If context suggests both A and B -> refuse to classify (-1)"
- Bad Generalizability: When the text says 'penguins in Antarctica' on May 3, 2021 ... -> <action>
- Good Generalizability: When a rare entity is mentioned with no supporting context ... -> <action>

If it is not a new edge case, output the string "EMPTY".

Response Format:
{
  "analysis": "Step-by-step evaluation of ALL guideline criteria with text evidence",
  "annotation": "Final label or -1 if unclassifiable",
  "confidence": Integer 0-100 indicate your annotation confidence,
  "new_edge_case": Boolean true or false indicate if it is a new edge case or not,
  "new_edge_case_rule": "If it is a new edge case, give an edge case rule in 'When <condition> -> <action>' format (DON'T forget the arrow ->); Otherwise write EMPTY",
}

<text_to_annotate>
{text}
</text_to_annotate>
"#;

/// Build the message sequence for one annotation call
pub fn build_annotation_messages(guideline: &str, text: &str) -> Vec<ChatMessage> {
    let user = ANNOTATION_TEMPLATE
        .replace("{guideline}", guideline)
        .replace("{text}", text);
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}
