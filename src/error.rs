//! Error types for the clustering routines

use ndarray::ArrayView2;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised by the numeric routines in this crate
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A parameter is out of range for the given input
    #[error("invalid parameter `{name}` = {value}: {constraint}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Provided value
        value: String,
        /// Constraint that was violated
        constraint: String,
    },

    /// Every sample is identical, so distances carry no information
    #[error("degenerate input: all {n_samples} samples are identical")]
    DegenerateInput {
        /// Number of (identical) samples
        n_samples: usize,
    },

    #[error(transparent)]
    KMeans(#[from] linfa_clustering::KMeansError),

    #[error(transparent)]
    IndexBuild(#[from] linfa_nn::BuildError),

    #[error(transparent)]
    NeighbourQuery(#[from] linfa_nn::NnError),
}

impl ClusterError {
    pub(crate) fn invalid(
        name: &'static str,
        value: impl Display,
        constraint: impl Into<String>,
    ) -> Self {
        ClusterError::InvalidParameter {
            name,
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Result type for the clustering routines
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Reject empty matrices and matrices whose rows are all the same point.
pub(crate) fn check_feature_matrix(data: &ArrayView2<'_, f64>) -> ClusterResult<()> {
    let (n_samples, n_features) = data.dim();
    if n_samples == 0 {
        return Err(ClusterError::invalid("data", "0 rows", "need at least one sample"));
    }
    if n_features == 0 {
        return Err(ClusterError::invalid("data", "0 columns", "need at least one feature"));
    }

    let first = data.row(0);
    if n_samples > 1 && data.rows().into_iter().all(|row| row == first) {
        return Err(ClusterError::DegenerateInput { n_samples });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_empty_matrix_rejected() {
        let data = Array2::<f64>::zeros((0, 2));
        let err = check_feature_matrix(&data.view()).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidParameter { name: "data", .. }));
    }

    #[test]
    fn test_identical_rows_are_degenerate() {
        let data = array![[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]];
        let err = check_feature_matrix(&data.view()).unwrap_err();
        assert!(matches!(err, ClusterError::DegenerateInput { n_samples: 3 }));
    }

    #[test]
    fn test_single_row_is_accepted() {
        let data = array![[1.0, 2.0]];
        assert!(check_feature_matrix(&data.view()).is_ok());
    }

    #[test]
    fn test_error_message() {
        let err = ClusterError::invalid("k", 0, "must be positive");
        assert_eq!(err.to_string(), "invalid parameter `k` = 0: must be positive");
    }
}
