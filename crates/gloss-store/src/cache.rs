//! Response cache: the `ResponseCache` implementation over SQLite

use crate::{unix_now, SqliteStore, StoreError};
use gloss_domain::{CacheNamespace, ResponseCache};
use rusqlite::{params, OptionalExtension};

impl ResponseCache for SqliteStore {
    type Error = StoreError;

    fn get(&self, ns: CacheNamespace, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM response_cache WHERE namespace = ?1 AND cache_key = ?2",
                params![ns.as_str(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, ns: CacheNamespace, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // Idempotent upsert: a re-put of the same key keeps the newer value.
        conn.execute(
            "INSERT INTO response_cache (namespace, cache_key, value, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, cache_key) DO UPDATE SET value = excluded.value",
            params![ns.as_str(), key, value, unix_now()],
        )?;
        Ok(())
    }

    fn contains(&self, ns: CacheNamespace, key: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let present = conn
            .query_row(
                "SELECT 1 FROM response_cache WHERE namespace = ?1 AND cache_key = ?2",
                params![ns.as_str(), key],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let store = SqliteStore::in_memory().unwrap();
        let ns = CacheNamespace::Completions;

        assert!(store.get(ns, "k1").unwrap().is_none());
        assert!(!store.contains(ns, "k1").unwrap());

        store.put(ns, "k1", "v1").unwrap();
        assert_eq!(store.get(ns, "k1").unwrap().as_deref(), Some("v1"));
        assert!(store.contains(ns, "k1").unwrap());
    }

    #[test]
    fn test_namespaces_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(CacheNamespace::Completions, "k", "completion").unwrap();
        store.put(CacheNamespace::Embeddings, "k", "embedding").unwrap();

        assert_eq!(
            store.get(CacheNamespace::Completions, "k").unwrap().as_deref(),
            Some("completion")
        );
        assert_eq!(
            store.get(CacheNamespace::Embeddings, "k").unwrap().as_deref(),
            Some("embedding")
        );
    }

    #[test]
    fn test_exact_key_matching() {
        // Any whitespace difference is a different key
        let store = SqliteStore::in_memory().unwrap();
        let ns = CacheNamespace::Completions;
        store.put(ns, "model\nprompt", "v").unwrap();
        assert!(store.get(ns, "model\nprompt ").unwrap().is_none());
        assert!(store.get(ns, "model\nPrompt").unwrap().is_none());
    }

    #[test]
    fn test_reput_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let ns = CacheNamespace::Embeddings;
        store.put(ns, "k", "v1").unwrap();
        store.put(ns, "k", "v1").unwrap();
        assert_eq!(store.get(ns, "k").unwrap().as_deref(), Some("v1"));
    }
}
