//! Fitted-model persistence, keyed by (task, purpose)

use crate::{unix_now, SqliteStore, StoreError};
use gloss_cluster::FittedModel;
use gloss_domain::ModelPurpose;
use rusqlite::{params, OptionalExtension};
use tracing::info;

impl SqliteStore {
    /// Load the fitted model for a task and purpose, if one exists
    pub fn load_model(
        &self,
        task_id: &str,
        purpose: ModelPurpose,
    ) -> Result<Option<FittedModel>, StoreError> {
        let conn = self.lock()?;
        let json = conn
            .query_row(
                "SELECT model_json FROM fitted_models WHERE task_id = ?1 AND purpose = ?2",
                params![task_id, purpose.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match json {
            Some(json) => {
                let model: FittedModel = serde_json::from_str(&json).map_err(|e| {
                    // An unreadable persisted model is fatal; silently
                    // refitting would reshuffle cluster ids under the task.
                    StoreError::Corrupt(format!(
                        "fitted model for ({}, {}) is unreadable: {}",
                        task_id,
                        purpose.as_str(),
                        e
                    ))
                })?;
                Ok(Some(model))
            }
            None => Ok(None),
        }
    }

    /// Persist a freshly fitted model. Last write wins when two first-time
    /// fits race on the same task+purpose.
    pub fn save_model(
        &self,
        task_id: &str,
        purpose: ModelPurpose,
        model: &FittedModel,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(model)
            .map_err(|e| StoreError::InvalidData(format!("model serialization: {}", e)))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO fitted_models (task_id, purpose, model_json, fitted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(task_id, purpose) DO UPDATE SET
             model_json = excluded.model_json, fitted_at = excluded.fitted_at",
            params![task_id, purpose.as_str(), json, unix_now()],
        )?;
        info!(task_id, purpose = purpose.as_str(), "persisted fitted model");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gloss_cluster::{Clusterer, KMeans, Pca};

    fn fitted() -> FittedModel {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, 5.0]];
        let (kmeans, _) = KMeans::fit(&data, 2).unwrap();
        FittedModel {
            pca: Pca::fit(&data).unwrap(),
            clusterer: Clusterer::Plain(kmeans),
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store
            .load_model("t1", ModelPurpose::Topical)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let model = fitted();
        store.save_model("t1", ModelPurpose::Topical, &model).unwrap();

        let loaded = store
            .load_model("t1", ModelPurpose::Topical)
            .unwrap()
            .expect("model should exist");
        assert_eq!(loaded.clusterer.k(), 2);
        assert_eq!(loaded.apply(&[0.0, 0.0]), model.apply(&[0.0, 0.0]));
    }

    #[test]
    fn test_purposes_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_model("t1", ModelPurpose::Topical, &fitted())
            .unwrap();
        assert!(store
            .load_model("t1", ModelPurpose::Semantic)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_corrupt_model_is_fatal_not_overwritten() {
        let store = SqliteStore::in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO fitted_models (task_id, purpose, model_json, fitted_at)
                 VALUES ('t1', 'topical', 'not json', 0)",
                [],
            )
            .unwrap();
        }
        let err = store.load_model("t1", ModelPurpose::Topical).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
