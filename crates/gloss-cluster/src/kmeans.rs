//! Plain k-means with deterministic initialization

use crate::{check_embeddings, sq_dist, ClusterError};
use serde::{Deserialize, Serialize};

/// Iteration cap for Lloyd's algorithm; assignments usually stabilize in
/// far fewer rounds at the dataset sizes seen here.
const MAX_ITERATIONS: usize = 50;

/// A fitted k-means model: just the centroids.
///
/// Prediction is nearest-centroid by Euclidean distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    centroids: Vec<Vec<f32>>,
}

impl KMeans {
    /// Fit `k` clusters on the given embeddings and return the model along
    /// with the assignment of each input point, in input order.
    ///
    /// Initial centers come from a farthest-point sweep starting at the
    /// first embedding, so fitting is deterministic.
    pub fn fit(embeddings: &[Vec<f32>], k: usize) -> Result<(Self, Vec<usize>), ClusterError> {
        check_embeddings(embeddings)?;
        if k == 0 || k > embeddings.len() {
            return Err(ClusterError::TooManyClusters(k, embeddings.len()));
        }

        let mut centroids = farthest_point_init(embeddings, k);
        let mut assignments = vec![0usize; embeddings.len()];

        for _ in 0..MAX_ITERATIONS {
            let mut changed = false;
            for (i, e) in embeddings.iter().enumerate() {
                let best = nearest(&centroids, e);
                if assignments[i] != best {
                    assignments[i] = best;
                    changed = true;
                }
            }

            recompute_centroids(embeddings, &assignments, &mut centroids);

            if !changed {
                break;
            }
        }

        Ok((Self { centroids }, assignments))
    }

    /// Index of the nearest centroid to the given embedding
    pub fn predict(&self, embedding: &[f32]) -> usize {
        nearest(&self.centroids, embedding)
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Borrow the fitted centroids
    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    pub(crate) fn from_centroids(centroids: Vec<Vec<f32>>) -> Self {
        Self { centroids }
    }
}

/// Farthest-point initialization: start from the first embedding, then
/// repeatedly add the point farthest from all chosen centers.
pub(crate) fn farthest_point_init(embeddings: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
    let mut centers: Vec<Vec<f32>> = vec![embeddings[0].clone()];
    let mut min_dist: Vec<f64> = embeddings
        .iter()
        .map(|e| sq_dist(e, &centers[0]))
        .collect();

    while centers.len() < k {
        let (next, _) = min_dist
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        centers.push(embeddings[next].clone());
        let added = centers.last().unwrap();
        for (i, e) in embeddings.iter().enumerate() {
            let d = sq_dist(e, added);
            if d < min_dist[i] {
                min_dist[i] = d;
            }
        }
    }

    centers
}

pub(crate) fn nearest(centroids: &[Vec<f32>], embedding: &[f32]) -> usize {
    let mut best = 0usize;
    let mut best_dist = f64::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let d = sq_dist(c, embedding);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Recompute each centroid as the mean of its members. Clusters that end up
/// empty keep their previous centroid.
pub(crate) fn recompute_centroids(
    embeddings: &[Vec<f32>],
    assignments: &[usize],
    centroids: &mut [Vec<f32>],
) {
    let dim = embeddings[0].len();
    let mut sums = vec![vec![0.0f64; dim]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (e, &a) in embeddings.iter().zip(assignments.iter()) {
        counts[a] += 1;
        for (j, v) in e.iter().enumerate() {
            sums[a][j] += *v as f64;
        }
    }

    for (c, (sum, count)) in centroids.iter_mut().zip(sums.iter().zip(counts.iter())) {
        if *count == 0 {
            continue;
        }
        for (j, s) in sum.iter().enumerate() {
            c[j] = (s / *count as f64) as f32;
        }
    }
}
