//! Lloyd's algorithm (naive k-means) over a fixed feature matrix

use log::{debug, trace, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::seq::index::sample;
use rand::Rng;

use crate::error::{check_feature_matrix, ClusterError, ClusterResult};

/// Default iteration budget for [`cluster`]
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default per-element centroid displacement tolerance for [`cluster`]
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Parameters for a Lloyd run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LloydParams {
    /// Number of clusters
    pub n_clusters: usize,
    /// Upper bound on assignment/update rounds
    pub max_iterations: usize,
    /// Largest per-element centroid shift that still counts as converged
    pub tolerance: f64,
}

/// Fitted centroids and assignments
#[derive(Debug, Clone)]
pub struct LloydModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Final centroids, shape (k, D)
    pub centroids: Array2<f64>,
    /// Cluster index of every sample row
    pub labels: Array1<usize>,
    /// Rounds actually performed
    pub n_iterations: usize,
    /// Whether the tolerance stop fired before the budget ran out
    pub converged: bool,
    /// Within-cluster sum of squares measured at each assignment step
    pub inertia_history: Vec<f64>,
    /// How many times an empty cluster kept its previous centroid
    pub empty_cluster_retentions: usize,
}

impl LloydParams {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self, data: &ArrayView2<'_, f64>) -> ClusterResult<()> {
        check_feature_matrix(data)?;

        let n_samples = data.nrows();
        if self.n_clusters == 0 || self.n_clusters > n_samples {
            return Err(ClusterError::invalid(
                "k",
                self.n_clusters,
                format!("must be in 1..={n_samples}"),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ClusterError::invalid("max_iterations", 0, "must be positive"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ClusterError::invalid(
                "tolerance",
                self.tolerance,
                "must be finite and non-negative",
            ));
        }

        Ok(())
    }

    /// Seed centroids with `n_clusters` distinct rows drawn from `rng`, then iterate.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        data: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> ClusterResult<LloydModel> {
        self.validate(&data)?;

        let seeds = sample(rng, data.nrows(), self.n_clusters).into_vec();
        debug!("Lloyd seeds: rows {:?}", seeds);
        let centroids = data.select(Axis(0), &seeds);

        Ok(self.iterate(data, centroids))
    }

    /// Iterate from caller-provided initial centroids; `n_clusters` is taken from their row count.
    pub fn fit_with_centroids(
        &self,
        data: ArrayView2<'_, f64>,
        initial: ArrayView2<'_, f64>,
    ) -> ClusterResult<LloydModel> {
        let params = Self {
            n_clusters: initial.nrows(),
            ..*self
        };
        params.validate(&data)?;

        if initial.ncols() != data.ncols() {
            return Err(ClusterError::invalid(
                "initial",
                format!("{} columns", initial.ncols()),
                format!("centroids must have {} columns", data.ncols()),
            ));
        }

        Ok(params.iterate(data, initial.to_owned()))
    }

    fn iterate(&self, data: ArrayView2<'_, f64>, mut centroids: Array2<f64>) -> LloydModel {
        let mut labels = Array1::zeros(data.nrows());
        let mut inertia_history = Vec::with_capacity(self.max_iterations);
        let mut empty_cluster_retentions = 0;
        let mut n_iterations = 0;
        let mut converged = false;

        while n_iterations < self.max_iterations {
            n_iterations += 1;

            let inertia = assign_labels(&data, &centroids, &mut labels);
            inertia_history.push(inertia);

            let (updated, empty) = update_centroids(&data, &labels, &centroids);
            empty_cluster_retentions += empty;

            let settled = updated
                .iter()
                .zip(centroids.iter())
                .all(|(new, old)| (new - old).abs() <= self.tolerance);
            centroids = updated;

            trace!(
                "Lloyd iteration {}: inertia={:.6}, empty clusters={}",
                n_iterations,
                inertia,
                empty
            );

            if settled {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("Lloyd converged after {} iterations", n_iterations);
        } else {
            warn!(
                "Lloyd stopped after {} iterations without reaching tolerance {}",
                n_iterations, self.tolerance
            );
        }

        LloydModel {
            n_clusters: self.n_clusters,
            centroids,
            labels,
            n_iterations,
            converged,
            inertia_history,
            empty_cluster_retentions,
        }
    }
}

impl LloydModel {
    /// Nearest centroid for a new sample
    pub fn predict(&self, features: ArrayView1<'_, f64>) -> ClusterResult<usize> {
        if features.len() != self.centroids.ncols() {
            return Err(ClusterError::invalid(
                "features",
                format!("length {}", features.len()),
                format!("must have {} dimensions", self.centroids.ncols()),
            ));
        }

        Ok(nearest_centroid(&features, &self.centroids).0)
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in self.labels.iter() {
            sizes[label] += 1;
        }
        sizes
    }

    /// Within-cluster sum of squares of `data` against the final centroids
    pub fn inertia(&self, data: ArrayView2<'_, f64>) -> f64 {
        compute_inertia(&data, &self.labels, &self.centroids)
    }
}

/// Run Lloyd's algorithm with seeded random initialization.
///
/// # Arguments
/// * `data` - Feature matrix (rows = samples)
/// * `k` - Number of clusters, `1..=N`
/// * `max_iterations` - Iteration budget; exhausting it is not an error
/// * `tolerance` - Per-element centroid shift at which iteration stops
/// * `rng` - Source for picking the initial centroid rows
pub fn cluster<R: Rng + ?Sized>(
    data: ArrayView2<'_, f64>,
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    rng: &mut R,
) -> ClusterResult<LloydModel> {
    LloydParams::new(k)
        .max_iterations(max_iterations)
        .tolerance(tolerance)
        .fit(data, rng)
}

/// Assign each row to its nearest centroid and return the resulting inertia.
fn assign_labels(
    data: &ArrayView2<'_, f64>,
    centroids: &Array2<f64>,
    labels: &mut Array1<usize>,
) -> f64 {
    let mut inertia = 0.0;
    for (point, label) in data.rows().into_iter().zip(labels.iter_mut()) {
        let (closest, distance) = nearest_centroid(&point, centroids);
        *label = closest;
        inertia += distance * distance;
    }
    inertia
}

/// Per-cluster means; a cluster with no members keeps its previous centroid.
fn update_centroids(
    data: &ArrayView2<'_, f64>,
    labels: &Array1<usize>,
    previous: &Array2<f64>,
) -> (Array2<f64>, usize) {
    let mut sums = Array2::<f64>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];

    for (point, &label) in data.rows().into_iter().zip(labels.iter()) {
        let mut sum = sums.row_mut(label);
        sum += &point;
        counts[label] += 1;
    }

    let mut empty = 0;
    for (cluster_idx, mut row) in sums.outer_iter_mut().enumerate() {
        match counts[cluster_idx] {
            0 => {
                row.assign(&previous.row(cluster_idx));
                empty += 1;
            }
            count => row /= count as f64,
        }
    }

    (sums, empty)
}

/// Index and distance of the closest centroid; the lowest index wins ties.
fn nearest_centroid(point: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut min_distance = f64::INFINITY;
    let mut closest_cluster = 0;

    for (cluster_idx, centroid) in centroids.outer_iter().enumerate() {
        let distance = euclidean_distance(point, &centroid);
        if distance < min_distance {
            min_distance = distance;
            closest_cluster = cluster_idx;
        }
    }

    (closest_cluster, min_distance)
}

/// Compute within-cluster sum of squares (inertia)
pub(crate) fn compute_inertia(
    features: &ArrayView2<'_, f64>,
    labels: &Array1<usize>,
    centroids: &Array2<f64>,
) -> f64 {
    features
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(point, &cluster)| euclidean_distance(&point, &centroids.row(cluster)).powi(2))
        .sum()
}

/// Calculate Euclidean distance between two points
pub(crate) fn euclidean_distance(point1: &ArrayView1<'_, f64>, point2: &ArrayView1<'_, f64>) -> f64 {
    point1
        .iter()
        .zip(point2.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn four_points() -> Array2<f64> {
        array![[0.0, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]]
    }

    fn three_blobs() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.3, -0.2],
            [-0.1, 0.4],
            [0.2, 0.1],
            [8.0, 8.0],
            [8.3, 7.8],
            [7.9, 8.4],
            [8.1, 8.2],
            [-6.0, 9.0],
            [-6.2, 9.3],
            [-5.8, 8.7],
            [-6.1, 9.1],
            [3.0, 4.0],
            [-2.0, 5.0],
        ]
    }

    #[test]
    fn test_output_shape_and_label_range() {
        let data = three_blobs();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let model = cluster(data.view(), 3, 100, 1e-4, &mut rng).unwrap();

            assert_eq!(model.centroids.shape(), &[3, 2]);
            assert_eq!(model.labels.len(), data.nrows());
            assert!(model.labels.iter().all(|&label| label < 3));
            assert!(model.centroids.iter().all(|v| v.is_finite()));
            assert_eq!(model.cluster_sizes().iter().sum::<usize>(), data.nrows());
        }
    }

    #[test]
    fn test_inertia_never_increases() {
        let data = three_blobs();
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let model = cluster(data.view(), 4, 100, 1e-6, &mut rng).unwrap();

            assert_eq!(model.inertia_history.len(), model.n_iterations);
            for pair in model.inertia_history.windows(2) {
                assert!(pair[1] <= pair[0] + 1e-9, "inertia rose: {:?}", pair);
            }
        }
    }

    #[test]
    fn test_stable_centroids_stop_after_one_iteration() {
        // With k == N every row is its own cluster mean.
        let data = array![[0.0, 0.0], [5.0, 5.0], [-3.0, 2.0]];
        let mut rng = StdRng::seed_from_u64(7);
        let model = cluster(data.view(), 3, 100, 1e-4, &mut rng).unwrap();

        assert!(model.converged);
        assert_eq!(model.n_iterations, 1);
        for (i, row) in data.outer_iter().enumerate() {
            assert_eq!(model.centroids.row(model.labels[i]), row);
        }
    }

    #[test]
    fn test_four_points_split_by_column() {
        let data = four_points();
        // Every seeding that takes one point from each side.
        for (a, b) in [(0, 2), (0, 3), (1, 2), (1, 3), (2, 0), (3, 1)] {
            let initial = data.select(Axis(0), &[a, b]);
            let model = LloydParams::new(2)
                .fit_with_centroids(data.view(), initial.view())
                .unwrap();

            assert!(model.converged);
            assert_eq!(model.labels[0], model.labels[1]);
            assert_eq!(model.labels[2], model.labels[3]);
            assert_ne!(model.labels[0], model.labels[2]);

            let left = model.centroids.row(model.labels[0]);
            let right = model.centroids.row(model.labels[2]);
            assert_abs_diff_eq!(left[0], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(left[1], 0.5, epsilon = 1e-12);
            assert_abs_diff_eq!(right[0], 10.0, epsilon = 1e-12);
            assert_abs_diff_eq!(right[1], 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = three_blobs();
        let first = cluster(data.view(), 3, 100, 1e-4, &mut StdRng::seed_from_u64(42)).unwrap();
        let second = cluster(data.view(), 3, 100, 1e-4, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(first.labels, second.labels);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn test_ties_go_to_lowest_index_and_empty_cluster_is_retained() {
        let data = array![[0.0, 0.0], [2.0, 0.0]];
        let initial = array![[1.0, 0.0], [1.0, 0.0]];
        let model = LloydParams::new(2)
            .fit_with_centroids(data.view(), initial.view())
            .unwrap();

        assert_eq!(model.labels, array![0usize, 0]);
        assert_eq!(model.centroids, initial);
        assert_eq!(model.empty_cluster_retentions, 1);
        assert!(model.converged);
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let data = three_blobs();
        let initial = array![[100.0, 100.0], [-100.0, -100.0], [0.0, 50.0]];
        let model = LloydParams::new(3)
            .max_iterations(1)
            .fit_with_centroids(data.view(), initial.view())
            .unwrap();

        assert_eq!(model.n_iterations, 1);
        assert!(!model.converged);
        assert_eq!(model.labels.len(), data.nrows());
    }

    #[test]
    fn test_predict() {
        let data = four_points();
        let initial = data.select(Axis(0), &[0, 2]);
        let model = LloydParams::new(2)
            .fit_with_centroids(data.view(), initial.view())
            .unwrap();

        assert_eq!(model.predict(array![1.0, 0.2].view()).unwrap(), model.labels[0]);
        assert_eq!(model.predict(array![9.0, 0.8].view()).unwrap(), model.labels[2]);
        assert!(model.predict(array![1.0].view()).is_err());
        assert_abs_diff_eq!(model.inertia(data.view()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let data = four_points();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            cluster(data.view(), 0, 100, 1e-4, &mut rng),
            Err(ClusterError::InvalidParameter { name: "k", .. })
        ));
        assert!(matches!(
            cluster(data.view(), 5, 100, 1e-4, &mut rng),
            Err(ClusterError::InvalidParameter { name: "k", .. })
        ));
        assert!(matches!(
            cluster(data.view(), 2, 0, 1e-4, &mut rng),
            Err(ClusterError::InvalidParameter { name: "max_iterations", .. })
        ));
        assert!(matches!(
            cluster(data.view(), 2, 100, -1.0, &mut rng),
            Err(ClusterError::InvalidParameter { name: "tolerance", .. })
        ));

        let initial = array![[0.0, 0.0, 0.0]];
        assert!(LloydParams::new(1)
            .fit_with_centroids(data.view(), initial.view())
            .is_err());
    }

    #[test]
    fn test_identical_rows_rejected() {
        let data = array![[3.0, 3.0], [3.0, 3.0], [3.0, 3.0]];
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            cluster(data.view(), 2, 100, 1e-4, &mut rng),
            Err(ClusterError::DegenerateInput { n_samples: 3 })
        ));
    }
}
