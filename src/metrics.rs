//! Cluster quality scores used to compare labelings of the same data

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::{ClusterError, ClusterResult};
use crate::lloyd::euclidean_distance;

/// Labels renumbered to `0..n_clusters` in ascending order of the original label.
struct Partition {
    labels: Vec<usize>,
    sizes: Vec<usize>,
}

impl Partition {
    fn new(data: &ArrayView2<'_, f64>, labels: &Array1<usize>) -> ClusterResult<Self> {
        if labels.len() != data.nrows() {
            return Err(ClusterError::invalid(
                "labels",
                format!("length {}", labels.len()),
                format!("must match the {} samples", data.nrows()),
            ));
        }

        let mut ids = BTreeMap::new();
        for &label in labels.iter() {
            let next = ids.len();
            ids.entry(label).or_insert(next);
        }
        // BTreeMap iterates in key order; reassign so ids follow it too.
        for (position, id) in ids.values_mut().enumerate() {
            *id = position;
        }

        let n_clusters = ids.len();
        if n_clusters < 2 || n_clusters >= data.nrows() {
            return Err(ClusterError::invalid(
                "labels",
                format!("{n_clusters} distinct labels"),
                format!("need between 2 and {} clusters", data.nrows().saturating_sub(1)),
            ));
        }

        let labels: Vec<usize> = labels.iter().map(|label| ids[label]).collect();
        let mut sizes = vec![0; n_clusters];
        for &label in &labels {
            sizes[label] += 1;
        }

        Ok(Self { labels, sizes })
    }

    fn centroids(&self, data: &ArrayView2<'_, f64>) -> Array2<f64> {
        let mut centroids = Array2::zeros((self.sizes.len(), data.ncols()));
        for (point, &label) in data.outer_iter().zip(&self.labels) {
            let mut row = centroids.row_mut(label);
            row += &point;
        }
        for (mut row, &size) in centroids.outer_iter_mut().zip(&self.sizes) {
            row /= size as f64;
        }
        centroids
    }
}

/// Mean silhouette coefficient over all samples.
///
/// Samples in a singleton cluster score 0.
pub fn silhouette_score(data: ArrayView2<'_, f64>, labels: &Array1<usize>) -> ClusterResult<f64> {
    let partition = Partition::new(&data, labels)?;
    let n_samples = data.nrows();
    let n_clusters = partition.sizes.len();

    let mut silhouette_sum = 0.0;
    for i in 0..n_samples {
        let own = partition.labels[i];
        if partition.sizes[own] == 1 {
            continue;
        }

        let point = data.row(i);
        let mut totals = vec![0.0; n_clusters];
        for j in 0..n_samples {
            if i != j {
                totals[partition.labels[j]] += euclidean_distance(&point, &data.row(j));
            }
        }

        // a(i): mean distance to the rest of its own cluster
        let a_i = totals[own] / (partition.sizes[own] - 1) as f64;
        // b(i): smallest mean distance to another cluster
        let b_i = totals
            .iter()
            .zip(&partition.sizes)
            .enumerate()
            .filter(|&(cluster, _)| cluster != own)
            .map(|(_, (total, &size))| total / size as f64)
            .fold(f64::INFINITY, f64::min);

        let denominator = a_i.max(b_i);
        if denominator > 0.0 {
            silhouette_sum += (b_i - a_i) / denominator;
        }
    }

    Ok(silhouette_sum / n_samples as f64)
}

/// Davies-Bouldin index; lower is better.
pub fn davies_bouldin_score(data: ArrayView2<'_, f64>, labels: &Array1<usize>) -> ClusterResult<f64> {
    let partition = Partition::new(&data, labels)?;
    let centroids = partition.centroids(&data);
    let n_clusters = partition.sizes.len();

    let mut scatter = vec![0.0; n_clusters];
    for (point, &label) in data.outer_iter().zip(&partition.labels) {
        scatter[label] += euclidean_distance(&point, &centroids.row(label));
    }
    for (spread, &size) in scatter.iter_mut().zip(&partition.sizes) {
        *spread /= size as f64;
    }

    let mut total = 0.0;
    for i in 0..n_clusters {
        let worst = (0..n_clusters)
            .filter(|&j| j != i)
            .map(|j| {
                let separation = euclidean_distance(&centroids.row(i), &centroids.row(j));
                if separation == 0.0 {
                    0.0
                } else {
                    (scatter[i] + scatter[j]) / separation
                }
            })
            .fold(0.0, f64::max);
        total += worst;
    }

    Ok(total / n_clusters as f64)
}

/// Calinski-Harabasz index (variance ratio criterion); higher is better.
pub fn calinski_harabasz_score(
    data: ArrayView2<'_, f64>,
    labels: &Array1<usize>,
) -> ClusterResult<f64> {
    let partition = Partition::new(&data, labels)?;
    let centroids = partition.centroids(&data);
    let n_samples = data.nrows() as f64;
    let n_clusters = partition.sizes.len() as f64;

    let overall = data
        .mean_axis(Axis(0))
        .ok_or_else(|| ClusterError::invalid("data", "0 rows", "need at least one sample"))?;

    let between: f64 = centroids
        .outer_iter()
        .zip(&partition.sizes)
        .map(|(centroid, &size)| size as f64 * euclidean_distance(&centroid, &overall.view()).powi(2))
        .sum();
    let within: f64 = data
        .outer_iter()
        .zip(&partition.labels)
        .map(|(point, &label)| euclidean_distance(&point, &centroids.row(label)).powi(2))
        .sum();

    if within == 0.0 {
        return Ok(1.0);
    }

    Ok(between * (n_samples - n_clusters) / (within * (n_clusters - 1.0)))
}

/// Give density-clustering noise (`None`) its own label after the real clusters.
pub fn noise_as_cluster(labels: &Array1<Option<usize>>) -> Array1<usize> {
    let noise = labels.iter().flatten().max().map_or(0, |&max| max + 1);
    labels.mapv(|label| label.unwrap_or(noise))
}
