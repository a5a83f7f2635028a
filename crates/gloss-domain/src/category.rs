//! Edge-case categories - consolidated rules produced by synthesis

use serde::{Deserialize, Serialize};

/// A consolidated guideline-improvement rule covering a group of edge cases.
///
/// Produced fresh on every synthesis run. During the merge phase a category
/// may absorb the members of near-duplicate categories; the final set is
/// re-labeled with dense integer ids `0..K-1` in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCaseCategory {
    /// Rule text in the `"when <condition> -> <action>"` grammar
    pub description: String,

    /// uids of the contributing records, in first-seen order.
    /// Duplicates across merged groups are tolerated.
    pub member_uids: Vec<String>,
}

impl EdgeCaseCategory {
    /// Create a category with an initial member set
    pub fn new(description: impl Into<String>, member_uids: Vec<String>) -> Self {
        Self {
            description: description.into(),
            member_uids,
        }
    }

    /// Absorb another category's members (merge phase)
    pub fn absorb(&mut self, other_members: Vec<String>) {
        self.member_uids.extend(other_members);
    }
}
