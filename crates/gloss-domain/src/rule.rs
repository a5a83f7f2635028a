//! Edge-case rule grammar helpers
//!
//! Edge-case rules follow the fixed grammar `"when <condition> -> <action>"`.
//! The condition clause is what gets embedded and clustered; the full rule is
//! what humans fold back into the guideline.

/// Separator between the condition and action clauses of a rule
pub const RULE_ARROW: &str = "->";

/// Extract the condition clause of a rule: everything before the `->`
/// separator, trimmed. Rules without a separator are returned whole.
///
/// # Examples
///
/// ```
/// use gloss_domain::rule::condition_clause;
///
/// assert_eq!(
///     condition_clause("when sarcasm targets a group -> label as hate"),
///     "when sarcasm targets a group"
/// );
/// assert_eq!(condition_clause("no arrow here"), "no arrow here");
/// ```
pub fn condition_clause(rule: &str) -> &str {
    match rule.split_once(RULE_ARROW) {
        Some((condition, _)) => condition.trim(),
        None => rule.trim(),
    }
}
