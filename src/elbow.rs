//! Elbow heuristic for picking the number of clusters
//!
//! Fits the linfa K-Means for every candidate k in `2..=max_k`, records the
//! inertia of each fit and returns the k just before the steepest drop.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use log::debug;
use ndarray::{Array1, ArrayView2};
use rand::Rng;

use crate::error::{check_feature_matrix, ClusterError, ClusterResult};

/// Default largest candidate k
pub const DEFAULT_MAX_K: usize = 10;

/// Smallest k the heuristic will ever return
pub const MIN_K: usize = 2;

/// Settings for the reference K-Means fits behind the elbow curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElbowParams {
    /// Largest candidate k (inclusive)
    pub max_k: usize,
    /// Random restarts per candidate; the best fit is kept
    pub n_runs: usize,
    /// Iteration budget per restart
    pub max_n_iterations: u64,
    /// Convergence tolerance per restart
    pub tolerance: f64,
}

impl Default for ElbowParams {
    fn default() -> Self {
        Self {
            max_k: DEFAULT_MAX_K,
            n_runs: 10,
            max_n_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

impl ElbowParams {
    pub fn new(max_k: usize) -> Self {
        Self {
            max_k,
            ..Self::default()
        }
    }

    /// (k, inertia) for every k in `2..=max_k`.
    ///
    /// Every candidate starts from a clone of `rng`, so the curve is
    /// reproducible for a seeded generator.
    pub fn inertia_curve<R: Rng + Clone>(
        &self,
        data: ArrayView2<'_, f64>,
        rng: R,
    ) -> ClusterResult<Vec<(usize, f64)>> {
        check_feature_matrix(&data)?;

        if self.max_k < MIN_K + 1 {
            return Err(ClusterError::invalid(
                "max_k",
                self.max_k,
                "need at least two candidates (max_k >= 3)",
            ));
        }
        if data.nrows() < self.max_k {
            return Err(ClusterError::invalid(
                "max_k",
                self.max_k,
                format!("cannot exceed the number of samples ({})", data.nrows()),
            ));
        }

        (MIN_K..=self.max_k)
            .map(|k| {
                let model = fit_reference(data, k, self, rng.clone())?;
                let inertia = model.inertia();
                debug!("Elbow candidate k={}: inertia={:.4}", k, inertia);
                Ok::<_, ClusterError>((k, inertia))
            })
            .collect()
    }

    pub fn select_k<R: Rng + Clone>(&self, data: ArrayView2<'_, f64>, rng: R) -> ClusterResult<usize> {
        let curve = self.inertia_curve(data, rng)?;
        elbow_from_curve(&curve)
    }
}

/// Pick k with the elbow heuristic over `2..=max_k`.
pub fn select_k<R: Rng + Clone>(
    data: ArrayView2<'_, f64>,
    max_k: usize,
    rng: R,
) -> ClusterResult<usize> {
    ElbowParams::new(max_k).select_k(data, rng)
}

/// Apply the first-difference rule to a precomputed curve.
///
/// The chosen k is the first candidate's k plus the index of the most
/// negative difference (first occurrence wins), floored at [`MIN_K`].
pub fn elbow_from_curve(curve: &[(usize, f64)]) -> ClusterResult<usize> {
    if curve.len() < 2 {
        return Err(ClusterError::invalid(
            "curve",
            format!("{} points", curve.len()),
            "need at least two candidates to difference",
        ));
    }

    let mut steepest = 0;
    let mut steepest_drop = f64::INFINITY;
    for (idx, pair) in curve.windows(2).enumerate() {
        let drop = pair[1].1 - pair[0].1;
        if drop < steepest_drop {
            steepest_drop = drop;
            steepest = idx;
        }
    }

    let k = curve[0].0 + steepest;
    debug!("Steepest inertia drop {:.4} after k={}", steepest_drop, k);

    Ok(if k <= 1 { MIN_K } else { k })
}

/// Fit the linfa K-Means used as the reference clusterer.
pub fn fit_reference<R: Rng + Clone>(
    data: ArrayView2<'_, f64>,
    k: usize,
    params: &ElbowParams,
    rng: R,
) -> ClusterResult<KMeans<f64, L2Dist>> {
    let n_samples = data.nrows();
    let targets: Array1<usize> = Array1::zeros(n_samples);
    let dataset = Dataset::new(data.to_owned(), targets);

    let model = KMeans::params_with(k, rng, L2Dist)
        .n_runs(params.n_runs)
        .max_n_iterations(params.max_n_iterations)
        .tolerance(params.tolerance)
        .fit(&dataset)?;

    Ok(model)
}
