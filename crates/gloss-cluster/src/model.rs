//! The persisted (projector, clusterer) pair
//!
//! One `FittedModel` exists per task and clustering purpose. Once fitted it
//! is reused for prediction only; fitting is a one-time operation per
//! task+purpose and is never incremental.

use crate::{ConstrainedKMeans, KMeans, Pca};
use serde::{Deserialize, Serialize};

/// The cluster-assignment half of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clusterer {
    /// Plain k-means (topical clustering)
    Plain(KMeans),
    /// Size-constrained k-means (semantic rule clustering)
    Constrained(ConstrainedKMeans),
}

impl Clusterer {
    /// Nearest-centroid prediction
    pub fn predict(&self, embedding: &[f32]) -> usize {
        match self {
            Clusterer::Plain(m) => m.predict(embedding),
            Clusterer::Constrained(m) => m.predict(embedding),
        }
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        match self {
            Clusterer::Plain(m) => m.k(),
            Clusterer::Constrained(m) => m.k(),
        }
    }
}

/// A fitted dimensionality-reduction projector plus cluster model,
/// serialized as JSON for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    /// 2-D projector co-fit with the clusterer
    pub pca: Pca,
    /// Cluster assignment model
    pub clusterer: Clusterer,
}

impl FittedModel {
    /// Predict the cluster and 2-D projection for one embedding
    pub fn apply(&self, embedding: &[f32]) -> (usize, (f64, f64)) {
        (self.clusterer.predict(embedding), self.pca.transform(embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SizeBounds;

    fn data() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.2, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 4.9],
        ]
    }

    #[test]
    fn test_json_round_trip_plain() {
        let data = data();
        let (kmeans, _) = KMeans::fit(&data, 2).unwrap();
        let model = FittedModel {
            pca: Pca::fit(&data).unwrap(),
            clusterer: Clusterer::Plain(kmeans),
        };

        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();

        for e in &data {
            assert_eq!(model.apply(e), restored.apply(e));
        }
    }

    #[test]
    fn test_json_round_trip_constrained() {
        let data = data();
        let (ck, _) = ConstrainedKMeans::fit(&data, 2, SizeBounds::UNBOUNDED).unwrap();
        let model = FittedModel {
            pca: Pca::fit(&data).unwrap(),
            clusterer: Clusterer::Constrained(ck),
        };

        let json = serde_json::to_string(&model).unwrap();
        let restored: FittedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.clusterer.k(), 2);
        assert_eq!(model.apply(&data[0]), restored.apply(&data[0]));
    }
}
