//! 2-component PCA via power iteration
//!
//! Embedding dimensions run into the thousands while datasets stay small,
//! so the covariance matrix is never materialized: power iteration works on
//! matrix-free products v ↦ Xᵀ(Xv) over the mean-centered data.

use crate::{check_embeddings, ClusterError};
use serde::{Deserialize, Serialize};

const POWER_ITERATIONS: usize = 100;
const CONVERGENCE_EPS: f64 = 1e-9;

/// A fitted 2-component PCA projector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    mean: Vec<f64>,
    components: [Vec<f64>; 2],
}

impl Pca {
    /// Fit a 2-component projector on the given embeddings.
    ///
    /// Degenerate data (a single point, or zero variance) yields zero
    /// components, which project everything to the origin.
    pub fn fit(embeddings: &[Vec<f32>]) -> Result<Self, ClusterError> {
        let dim = check_embeddings(embeddings)?;
        let n = embeddings.len();

        let mut mean = vec![0.0f64; dim];
        for e in embeddings {
            for (j, v) in e.iter().enumerate() {
                mean[j] += *v as f64;
            }
        }
        for m in mean.iter_mut() {
            *m /= n as f64;
        }

        // Mean-centered rows
        let centered: Vec<Vec<f64>> = embeddings
            .iter()
            .map(|e| e.iter().zip(mean.iter()).map(|(v, m)| *v as f64 - m).collect())
            .collect();

        let first = dominant_component(&centered, None);
        let second = dominant_component(&centered, Some(first.as_slice()));

        Ok(Self {
            mean,
            components: [first, second],
        })
    }

    /// Project an embedding into the fitted 2-D space
    pub fn transform(&self, embedding: &[f32]) -> (f64, f64) {
        let centered: Vec<f64> = embedding
            .iter()
            .zip(self.mean.iter())
            .map(|(v, m)| *v as f64 - m)
            .collect();
        (
            dot(&centered, &self.components[0]),
            dot(&centered, &self.components[1]),
        )
    }

    /// Project a batch of embeddings
    pub fn transform_batch(&self, embeddings: &[Vec<f32>]) -> Vec<(f64, f64)> {
        embeddings.iter().map(|e| self.transform(e)).collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Power iteration for the dominant eigenvector of XᵀX, deflating against
/// an optional prior component by re-orthogonalizing every round.
fn dominant_component(centered: &[Vec<f64>], orthogonal_to: Option<&[f64]>) -> Vec<f64> {
    let dim = centered[0].len();

    // Deterministic start: the direction of the row with the largest norm,
    // orthogonalized against the prior component.
    let seed = centered
        .iter()
        .max_by(|a, b| norm(a).total_cmp(&norm(b)))
        .cloned()
        .unwrap_or_else(|| vec![0.0; dim]);
    let mut v = orthogonalize(seed, orthogonal_to);
    if normalize(&mut v).is_none() {
        return vec![0.0; dim];
    }

    for _ in 0..POWER_ITERATIONS {
        // w = Xᵀ (X v)
        let mut w = vec![0.0f64; dim];
        for row in centered {
            let proj = dot(row, &v);
            for (j, r) in row.iter().enumerate() {
                w[j] += proj * r;
            }
        }

        w = orthogonalize(w, orthogonal_to);
        let Some(len) = normalize(&mut w) else {
            return vec![0.0; dim];
        };

        let delta: f64 = v
            .iter()
            .zip(w.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = w;
        if len < CONVERGENCE_EPS || delta < CONVERGENCE_EPS {
            break;
        }
    }

    // Fix the sign so fitting is fully deterministic: first component with
    // meaningful magnitude is positive.
    if let Some(lead) = v.iter().find(|x| x.abs() > 1e-12) {
        if *lead < 0.0 {
            for x in v.iter_mut() {
                *x = -*x;
            }
        }
    }
    v
}

fn orthogonalize(mut v: Vec<f64>, against: Option<&[f64]>) -> Vec<f64> {
    if let Some(prior) = against {
        let proj = dot(&v, prior);
        for (x, p) in v.iter_mut().zip(prior.iter()) {
            *x -= proj * p;
        }
    }
    v
}

/// Normalize in place; `None` when the vector is (numerically) zero
fn normalize(v: &mut [f64]) -> Option<f64> {
    let len = norm(v);
    if len < 1e-15 {
        return None;
    }
    for x in v.iter_mut() {
        *x /= len;
    }
    Some(len)
}
