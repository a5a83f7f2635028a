//! Gloss Clustering Layer
//!
//! Small, deterministic clustering and projection primitives over plain
//! `Vec<f32>` embeddings:
//!
//! - `KMeans`: Lloyd's algorithm with farthest-point initialization
//! - `ConstrainedKMeans`: k-means with per-cluster size bounds
//! - `Pca`: 2-component principal component analysis via power iteration
//! - `FittedModel`: the serializable (projector, clusterer) pair persisted
//!   per task and purpose
//!
//! Everything here is deliberately free of RNG: initial centers are chosen
//! by a farthest-point sweep from the first embedding, so fitting the same
//! data always yields the same model. Datasets are small (tens to low
//! hundreds of rules per synthesis round), so no approximate or indexed
//! variant is needed.

#![warn(missing_docs)]

mod constrained;
mod kmeans;
mod model;
mod pca;

pub use constrained::{ConstrainedKMeans, SizeBounds};
pub use kmeans::KMeans;
pub use model::{Clusterer, FittedModel};
pub use pca::Pca;

use thiserror::Error;

/// Errors that can occur while fitting or applying models
#[derive(Error, Debug)]
pub enum ClusterError {
    /// No data points were supplied
    #[error("Cannot fit on an empty dataset")]
    EmptyDataset,

    /// Requested more clusters than data points
    #[error("Cluster count {0} exceeds dataset size {1}")]
    TooManyClusters(usize, usize),

    /// Embeddings with inconsistent dimensions
    #[error("Inconsistent embedding dimensions: expected {0}, got {1}")]
    DimensionMismatch(usize, usize),

    /// Size bounds that no assignment can satisfy
    #[error("Infeasible size bounds for {n} points in {k} clusters")]
    InfeasibleBounds {
        /// Number of data points
        n: usize,
        /// Number of clusters
        k: usize,
    },
}

/// Squared Euclidean distance between two vectors of equal length
pub(crate) fn sq_dist(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum()
}

/// Validate a batch of embeddings: non-empty, consistent dimensions
pub(crate) fn check_embeddings(embeddings: &[Vec<f32>]) -> Result<usize, ClusterError> {
    let first = embeddings.first().ok_or(ClusterError::EmptyDataset)?;
    let dim = first.len();
    for e in embeddings {
        if e.len() != dim {
            return Err(ClusterError::DimensionMismatch(dim, e.len()));
        }
    }
    Ok(dim)
}
