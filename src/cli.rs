//! Command-line interface definitions and argument parsing

use clap::Parser;

use crate::elbow::DEFAULT_MAX_K;
use crate::lloyd::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use crate::radius::DEFAULT_NEIGHBOURS;

/// Cluster a numeric CSV with Lloyd k-means and DBSCAN, choosing k and eps automatically
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Number of clusters; chosen with the elbow heuristic when omitted
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Largest k scanned by the elbow heuristic
    #[arg(long, default_value_t = DEFAULT_MAX_K)]
    pub max_k: usize,

    /// Neighbour count used to estimate the DBSCAN radius
    #[arg(short, long, default_value_t = DEFAULT_NEIGHBOURS)]
    pub neighbours: usize,

    /// Minimum points per dense region for DBSCAN
    #[arg(long, default_value_t = 5)]
    pub min_samples: usize,

    /// Maximum iterations for the Lloyd clusterer
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iters: usize,

    /// Tolerance for Lloyd convergence
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Random seed; drawn from the OS when omitted
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Output path for the cluster plot; the elbow chart goes next to it
    #[arg(short, long, default_value = "clusters.png")]
    pub output: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Reject option combinations the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.clusters == Some(0) {
            anyhow::bail!("--clusters must be at least 1");
        }
        if self.clusters.is_none() && self.max_k < 3 {
            anyhow::bail!("--max-k must be at least 3, got {}", self.max_k);
        }
        if self.neighbours == 0 {
            anyhow::bail!("--neighbours must be at least 1");
        }
        if self.min_samples == 0 {
            anyhow::bail!("--min-samples must be at least 1");
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            anyhow::bail!("--tolerance must be a non-negative number, got {}", self.tolerance);
        }
        Ok(())
    }

    /// Path of the elbow chart derived from `output`
    pub fn elbow_output(&self) -> String {
        match self.output.strip_suffix(".png") {
            Some(stem) => format!("{stem}_elbow.png"),
            None => format!("{}_elbow.png", self.output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> Args {
        Args::parse_from(["clustertune", "--input", "test.csv"])
    }

    #[test]
    fn test_defaults() {
        let args = default_args();
        assert_eq!(args.input, "test.csv");
        assert_eq!(args.clusters, None);
        assert_eq!(args.max_k, 10);
        assert_eq!(args.neighbours, 5);
        assert_eq!(args.max_iters, 100);
        assert_eq!(args.tolerance, 1e-4);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut args = default_args();
        args.max_k = 2;
        assert!(args.validate().is_err());

        args.clusters = Some(4);
        assert!(args.validate().is_ok());

        args.clusters = Some(0);
        assert!(args.validate().is_err());

        let mut args = default_args();
        args.tolerance = -1.0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_elbow_output() {
        let mut args = default_args();
        assert_eq!(args.elbow_output(), "clusters_elbow.png");

        args.output = "plots/run".to_string();
        assert_eq!(args.elbow_output(), "plots/run_elbow.png");
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["clustertune", "-k", "3", "--seed", "9", "--max-k", "6"]);
        assert_eq!(args.clusters, Some(3));
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.max_k, 6);
    }
}
