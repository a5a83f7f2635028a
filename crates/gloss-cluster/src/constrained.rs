//! Size-constrained k-means
//!
//! Enforces minimum/maximum member counts per cluster on top of a plain
//! k-means fit. Unconstrained fits come first; a greedy repair pass then
//! drains over-max clusters into their members' next-best clusters with
//! room, and fills under-min clusters by pulling the nearest points from
//! clusters that can spare them.

use crate::kmeans::{farthest_point_init, nearest, recompute_centroids};
use crate::{check_embeddings, sq_dist, ClusterError, KMeans};
use serde::{Deserialize, Serialize};

/// Iteration cap for the constrained fit loop
const MAX_ITERATIONS: usize = 50;

/// Per-cluster member-count bounds. `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    /// Minimum members per cluster
    pub min: Option<usize>,
    /// Maximum members per cluster
    pub max: Option<usize>,
}

impl SizeBounds {
    /// Unbounded on both sides
    pub const UNBOUNDED: SizeBounds = SizeBounds {
        min: None,
        max: None,
    };

    /// The step-function bounds used for semantic rule clustering:
    /// unconstrained for small N, then progressively tighter floors to keep
    /// clusters from degenerating into one giant cluster plus singletons.
    pub fn for_dataset_size(n: usize) -> SizeBounds {
        if n <= 20 {
            SizeBounds::UNBOUNDED
        } else if n <= 40 {
            SizeBounds {
                min: Some(5),
                max: Some(20),
            }
        } else {
            SizeBounds {
                min: Some(10),
                max: Some(20),
            }
        }
    }

    /// Whether an assignment of `n` points into `k` clusters can satisfy
    /// these bounds at all.
    pub fn feasible(&self, n: usize, k: usize) -> bool {
        if let Some(min) = self.min {
            if min * k > n {
                return false;
            }
        }
        if let Some(max) = self.max {
            if max * k < n {
                return false;
            }
        }
        true
    }
}

/// A fitted size-constrained k-means model.
///
/// Prediction on new points is plain nearest-centroid: the size bounds
/// constrain the fit, not later single-point predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstrainedKMeans {
    inner: KMeans,
    bounds: SizeBounds,
}

impl ConstrainedKMeans {
    /// Fit `k` size-bounded clusters and return the model with the
    /// assignment of each input point.
    pub fn fit(
        embeddings: &[Vec<f32>],
        k: usize,
        bounds: SizeBounds,
    ) -> Result<(Self, Vec<usize>), ClusterError> {
        check_embeddings(embeddings)?;
        let n = embeddings.len();
        if k == 0 || k > n {
            return Err(ClusterError::TooManyClusters(k, n));
        }
        if !bounds.feasible(n, k) {
            return Err(ClusterError::InfeasibleBounds { n, k });
        }

        let mut centroids = farthest_point_init(embeddings, k);
        let mut assignments: Vec<usize> = embeddings
            .iter()
            .map(|e| nearest(&centroids, e))
            .collect();

        for _ in 0..MAX_ITERATIONS {
            repair_max(embeddings, &centroids, &mut assignments, bounds.max, k);
            repair_min(embeddings, &centroids, &mut assignments, &bounds, k);
            recompute_centroids(embeddings, &assignments, &mut centroids);

            let next: Vec<usize> = embeddings.iter().map(|e| nearest(&centroids, e)).collect();
            if next == assignments {
                break;
            }
            assignments = next;
        }

        // Final repair in case the last reassignment round broke a bound
        repair_max(embeddings, &centroids, &mut assignments, bounds.max, k);
        repair_min(embeddings, &centroids, &mut assignments, &bounds, k);
        recompute_centroids(embeddings, &assignments, &mut centroids);

        Ok((
            Self {
                inner: KMeans::from_centroids(centroids),
                bounds,
            },
            assignments,
        ))
    }

    /// Index of the nearest centroid to the given embedding
    pub fn predict(&self, embedding: &[f32]) -> usize {
        self.inner.predict(embedding)
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.inner.k()
    }

    /// The bounds this model was fitted with
    pub fn bounds(&self) -> SizeBounds {
        self.bounds
    }
}

fn cluster_sizes(assignments: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; k];
    for &a in assignments {
        sizes[a] += 1;
    }
    sizes
}

/// Drain clusters above `max`: repeatedly move the member whose
/// reassignment to the nearest non-full cluster costs the least.
fn repair_max(
    embeddings: &[Vec<f32>],
    centroids: &[Vec<f32>],
    assignments: &mut [usize],
    max: Option<usize>,
    k: usize,
) {
    let Some(max) = max else { return };
    let mut sizes = cluster_sizes(assignments, k);

    loop {
        let Some(over) = sizes.iter().position(|&s| s > max) else {
            break;
        };

        let mut best_move: Option<(usize, usize, f64)> = None; // (point, target, cost)
        for (i, e) in embeddings.iter().enumerate() {
            if assignments[i] != over {
                continue;
            }
            let own = sq_dist(e, &centroids[over]);
            for (c, centroid) in centroids.iter().enumerate() {
                if c == over || sizes[c] >= max {
                    continue;
                }
                let cost = sq_dist(e, centroid) - own;
                if best_move.map(|(_, _, bc)| cost < bc).unwrap_or(true) {
                    best_move = Some((i, c, cost));
                }
            }
        }

        match best_move {
            Some((point, target, _)) => {
                sizes[assignments[point]] -= 1;
                assignments[point] = target;
                sizes[target] += 1;
            }
            // Every other cluster is full; bounds were checked feasible, so
            // this only happens when max * k == n and sizes already balance.
            None => break,
        }
    }
}

/// Fill clusters below `min` by pulling the nearest outside point from a
/// cluster that can spare one.
fn repair_min(
    embeddings: &[Vec<f32>],
    centroids: &[Vec<f32>],
    assignments: &mut [usize],
    bounds: &SizeBounds,
    k: usize,
) {
    let Some(min) = bounds.min else { return };
    let mut sizes = cluster_sizes(assignments, k);

    loop {
        let Some(under) = sizes.iter().position(|&s| s < min) else {
            break;
        };

        let mut best_pull: Option<(usize, f64)> = None; // (point, distance)
        for (i, e) in embeddings.iter().enumerate() {
            let from = assignments[i];
            if from == under || sizes[from] <= min {
                continue;
            }
            let d = sq_dist(e, &centroids[under]);
            if best_pull.map(|(_, bd)| d < bd).unwrap_or(true) {
                best_pull = Some((i, d));
            }
        }

        match best_pull {
            Some((point, _)) => {
                sizes[assignments[point]] -= 1;
                assignments[point] = under;
                sizes[under] += 1;
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1-D line of points; easy to reason about cluster sizes
    fn line(n: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![i as f32, 0.0]).collect()
    }

    #[test]
    fn test_bounds_step_function() {
        assert_eq!(SizeBounds::for_dataset_size(10), SizeBounds::UNBOUNDED);
        assert_eq!(SizeBounds::for_dataset_size(20), SizeBounds::UNBOUNDED);
        assert_eq!(
            SizeBounds::for_dataset_size(21),
            SizeBounds {
                min: Some(5),
                max: Some(20)
            }
        );
        assert_eq!(
            SizeBounds::for_dataset_size(40),
            SizeBounds {
                min: Some(5),
                max: Some(20)
            }
        );
        assert_eq!(
            SizeBounds::for_dataset_size(41),
            SizeBounds {
                min: Some(10),
                max: Some(20)
            }
        );
    }

    #[test]
    fn test_unconstrained_matches_feasibility() {
        assert!(SizeBounds::UNBOUNDED.feasible(1, 1));
        assert!(SizeBounds {
            min: Some(10),
            max: Some(20)
        }
        .feasible(45, 4));
        assert!(!SizeBounds {
            min: Some(10),
            max: None
        }
        .feasible(15, 2));
        assert!(!SizeBounds {
            min: None,
            max: Some(3)
        }
        .feasible(10, 2));
    }

    #[test]
    fn test_fit_respects_max_bound() {
        // 30 points, 2 clusters, max 20: a skewed natural split must be
        // rebalanced so no cluster exceeds 20.
        let data = line(30);
        let bounds = SizeBounds {
            min: Some(5),
            max: Some(20),
        };
        let (_, labels) = ConstrainedKMeans::fit(&data, 2, bounds).unwrap();
        let sizes = cluster_sizes(&labels, 2);
        assert!(sizes.iter().all(|&s| s <= 20), "sizes {:?}", sizes);
        assert!(sizes.iter().all(|&s| s >= 5), "sizes {:?}", sizes);
    }

    #[test]
    fn test_fit_respects_min_bound_on_skewed_data() {
        // One tight blob of 24 points plus 2 outliers. With min 5 the
        // outlier cluster must steal members from the blob.
        let mut data: Vec<Vec<f32>> = (0..24).map(|i| vec![i as f32 * 0.01, 0.0]).collect();
        data.push(vec![100.0, 0.0]);
        data.push(vec![100.1, 0.0]);
        let bounds = SizeBounds {
            min: Some(5),
            max: Some(21),
        };
        let (_, labels) = ConstrainedKMeans::fit(&data, 2, bounds).unwrap();
        let sizes = cluster_sizes(&labels, 2);
        assert!(sizes.iter().all(|&s| s >= 5), "sizes {:?}", sizes);
        assert!(sizes.iter().all(|&s| s <= 21), "sizes {:?}", sizes);
    }

    #[test]
    fn test_infeasible_bounds_rejected() {
        let data = line(15);
        let bounds = SizeBounds {
            min: Some(10),
            max: None,
        };
        assert!(matches!(
            ConstrainedKMeans::fit(&data, 2, bounds),
            Err(ClusterError::InfeasibleBounds { n: 15, k: 2 })
        ));
    }

    #[test]
    fn test_unbounded_fit_behaves_like_kmeans() {
        let data = line(10);
        let (model, labels) = ConstrainedKMeans::fit(&data, 2, SizeBounds::UNBOUNDED).unwrap();
        assert_eq!(labels.len(), 10);
        assert_eq!(model.k(), 2);
        // Prediction agrees with the fitted assignment
        for (e, &label) in data.iter().zip(labels.iter()) {
            assert_eq!(model.predict(e), label);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let data = line(25);
        let bounds = SizeBounds::for_dataset_size(25);
        let (_, a) = ConstrainedKMeans::fit(&data, 2, bounds).unwrap();
        let (_, b) = ConstrainedKMeans::fit(&data, 2, bounds).unwrap();
        assert_eq!(a, b);
    }
}
