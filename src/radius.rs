//! Neighbourhood radius for density clustering from k-th nearest neighbour distances

use linfa_nn::distance::{Distance, L2Dist};
use linfa_nn::{CommonNearestNeighbour, NearestNeighbour, NearestNeighbourIndex};
use log::debug;
use ndarray::{Array1, ArrayView2};

use crate::error::{check_feature_matrix, ClusterError, ClusterResult};

/// Default neighbour count, matching the usual DBSCAN `min_samples`
pub const DEFAULT_NEIGHBOURS: usize = 5;

/// Distance from every row to its k-th nearest neighbour.
///
/// Each row is searched for in the index it belongs to, so it counts as its
/// own first neighbour (distance 0). `k = 1` therefore yields all zeros.
pub fn kth_neighbour_distances(data: ArrayView2<'_, f64>, k: usize) -> ClusterResult<Array1<f64>> {
    check_feature_matrix(&data)?;

    if k == 0 || k > data.nrows() {
        return Err(ClusterError::invalid(
            "k",
            k,
            format!("must be in 1..={}", data.nrows()),
        ));
    }

    let index = CommonNearestNeighbour::KdTree.from_batch(&data, L2Dist)?;

    let mut distances = Array1::zeros(data.nrows());
    for (row, slot) in data.rows().into_iter().zip(distances.iter_mut()) {
        let neighbours = index.k_nearest(row, k)?;
        *slot = neighbours
            .iter()
            .map(|(point, _)| L2Dist.distance(row, point.view()))
            .fold(0.0, f64::max);
    }

    Ok(distances)
}

/// Mean k-th nearest neighbour distance, used as the DBSCAN `eps`.
pub fn estimate_radius(data: ArrayView2<'_, f64>, k: usize) -> ClusterResult<f64> {
    let distances = kth_neighbour_distances(data, k)?;
    let radius = distances.sum() / distances.len() as f64;
    debug!("Estimated radius {:.6} from {} rows at k={}", radius, distances.len(), k);
    Ok(radius)
}
