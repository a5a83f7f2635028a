//! Durability tests: state written through one store handle must be visible
//! after reopening the same database file.

use gloss_domain::{CacheNamespace, ModelPurpose, ResponseCache};
use gloss_store::SqliteStore;
use tempfile::TempDir;

#[test]
fn test_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gloss.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store
            .put(CacheNamespace::Completions, "model\nprompt", "response")
            .unwrap();
    }

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(
        reopened
            .get(CacheNamespace::Completions, "model\nprompt")
            .unwrap()
            .as_deref(),
        Some("response")
    );
}

#[test]
fn test_identity_mapping_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gloss.db");

    let uid = {
        let store = SqliteStore::open(&path).unwrap();
        store.resolve("task", "persistent text").unwrap()
    };

    let reopened = SqliteStore::open(&path).unwrap();
    assert_eq!(reopened.resolve("task", "persistent text").unwrap(), uid);
    assert_eq!(reopened.example_count("task").unwrap(), 1);
}

#[test]
fn test_fitted_model_survives_reopen() {
    use gloss_cluster::{Clusterer, FittedModel, KMeans, Pca};

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gloss.db");
    let data = vec![vec![0.0f32, 0.0], vec![4.0, 4.0], vec![4.1, 3.9]];

    {
        let store = SqliteStore::open(&path).unwrap();
        let (kmeans, _) = KMeans::fit(&data, 2).unwrap();
        let model = FittedModel {
            pca: Pca::fit(&data).unwrap(),
            clusterer: Clusterer::Plain(kmeans),
        };
        store
            .save_model("task", ModelPurpose::Semantic, &model)
            .unwrap();
    }

    let reopened = SqliteStore::open(&path).unwrap();
    let model = reopened
        .load_model("task", ModelPurpose::Semantic)
        .unwrap()
        .expect("model persisted");
    assert_eq!(model.clusterer.k(), 2);
}

#[test]
fn test_read_your_own_writes_across_handles() {
    // Two clones of the same store emulate the per-batch reopen pattern:
    // entries committed through one handle are visible through the other.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gloss.db");

    let a = SqliteStore::open(&path).unwrap();
    let b = a.clone();

    a.put(CacheNamespace::Embeddings, "k", "[1.0]").unwrap();
    assert!(b.contains(CacheNamespace::Embeddings, "k").unwrap());
}
