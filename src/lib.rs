//! clustertune: unsupervised clustering helpers for numeric feature matrices
//!
//! Provides a from-scratch Lloyd k-means, an elbow heuristic for choosing k,
//! and a k-nearest-neighbour estimate of the DBSCAN radius, plus the CSV,
//! scoring and plotting glue used by the command-line pipeline.

pub mod cli;
pub mod data;
pub mod elbow;
pub mod error;
pub mod lloyd;
pub mod metrics;
pub mod radius;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_feature_table, FeatureTable, StandardScaler};
pub use elbow::{elbow_from_curve, select_k, ElbowParams};
pub use error::{ClusterError, ClusterResult};
pub use lloyd::{cluster, LloydModel, LloydParams};
pub use radius::{estimate_radius, kth_neighbour_distances};

/// Result type for the pipeline layers (loading, plotting, CLI)
pub type Result<T> = anyhow::Result<T>;
