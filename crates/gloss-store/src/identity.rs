//! Identity mapper: stable per-task text <-> uid tables
//!
//! Same text always resolves to the same uid once assigned. Resolution is
//! idempotent across calls and deduplicates within a call: two occurrences
//! of identical text in one batch get one uid, not two.

use crate::{SqliteStore, StoreError};
use gloss_domain::ExampleId;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use tracing::debug;

impl SqliteStore {
    /// Resolve one text to its uid for a task, minting a fresh uid when the
    /// text has never been seen.
    pub fn resolve(&self, task_id: &str, text: &str) -> Result<String, StoreError> {
        let texts = [text.to_string()];
        let mut uids = self.resolve_batch(task_id, &texts)?;
        Ok(uids.remove(0))
    }

    /// Resolve a batch of texts to uids, in input order.
    ///
    /// Existing texts resolve to their previously assigned uids; only
    /// genuinely new texts get freshly minted ones. The updated mapping is
    /// committed before returning when anything new was assigned; nothing is
    /// written when every text was already known.
    pub fn resolve_batch(
        &self,
        task_id: &str,
        texts: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut minted = 0usize;

        for text in texts {
            if resolved.contains_key(text.as_str()) {
                continue;
            }
            let existing = tx
                .query_row(
                    "SELECT uid FROM examples WHERE task_id = ?1 AND text = ?2",
                    params![task_id, text],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;

            let uid = match existing {
                Some(uid) => uid,
                None => {
                    let uid = ExampleId::new().to_string();
                    tx.execute(
                        "INSERT INTO examples (task_id, uid, text) VALUES (?1, ?2, ?3)",
                        params![task_id, uid, text],
                    )
                    .map_err(corruption_on_conflict)?;
                    minted += 1;
                    uid
                }
            };
            resolved.insert(text.as_str(), uid);
        }

        tx.commit()?;
        if minted > 0 {
            debug!(task_id, minted, "minted new example uids");
        }

        Ok(texts
            .iter()
            .map(|t| resolved[t.as_str()].clone())
            .collect())
    }

    /// Look up the text behind a uid, if any
    pub fn text_for_uid(&self, task_id: &str, uid: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let text = conn
            .query_row(
                "SELECT text FROM examples WHERE task_id = ?1 AND uid = ?2",
                params![task_id, uid],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(text)
    }

    /// Number of distinct examples known for a task
    pub fn example_count(&self, task_id: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM examples WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// A uniqueness violation on insert means a freshly minted uid collided with
/// a persisted row: the mapping is inconsistent and must not be patched over.
fn corruption_on_conflict(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Corrupt(format!("uid collision in identity mapping: {}", e))
        }
        _ => StoreError::Database(e),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: resolving any batch twice yields identical uids, and
        /// distinct texts never share a uid.
        #[test]
        fn test_resolution_stable_and_injective(
            texts in proptest::collection::vec("[a-z]{0,12}", 1..20)
        ) {
            let store = SqliteStore::in_memory().unwrap();
            let first = store.resolve_batch("task", &texts).unwrap();
            let second = store.resolve_batch("task", &texts).unwrap();
            prop_assert_eq!(&first, &second);

            for (i, a) in texts.iter().enumerate() {
                for (j, b) in texts.iter().enumerate() {
                    if a == b {
                        prop_assert_eq!(&first[i], &first[j]);
                    } else {
                        prop_assert_ne!(&first[i], &first[j]);
                    }
                }
            }
        }
    }
}
