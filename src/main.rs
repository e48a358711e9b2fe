//! clustertune: choose k, run Lloyd k-means and DBSCAN on a numeric CSV
//!
//! This is the main entrypoint that orchestrates data loading, k selection,
//! clustering, scoring and visualization.

use anyhow::Result;
use clap::Parser;
use clustertune::elbow::{fit_reference, ElbowParams};
use clustertune::metrics::{calinski_harabasz_score, davies_bouldin_score, noise_as_cluster, silhouette_score};
use clustertune::{elbow_from_curve, estimate_radius, load_feature_table, viz, Args, LloydParams};
use linfa::prelude::*;
use linfa::ParamGuard;
use linfa_clustering::Dbscan;
use log::{info, warn};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    args.validate()?;
    run_pipeline(&args)
}

/// Run the full clustering pipeline
fn run_pipeline(args: &Args) -> Result<()> {
    println!("=== Clustering Pipeline ===\n");
    let start_time = Instant::now();

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Random seed: {}", seed);

    // Step 1: Load, impute and scale
    let table = load_feature_table(&args.input)?;
    println!(
        "✓ Data loaded: {} samples, {} features",
        table.features.nrows(),
        table.features.ncols()
    );
    if args.verbose {
        println!("  Columns: {}", table.columns.join(", "));
    }
    let features = table.features.view();

    // Step 2: Choose k
    let elbow_params = ElbowParams::new(args.max_k);
    let k = match args.clusters {
        Some(k) => {
            println!("✓ Using k = {} from the command line", k);
            k
        }
        None => {
            let curve = elbow_params.inertia_curve(features, StdRng::seed_from_u64(seed))?;
            let k = elbow_from_curve(&curve)?;
            println!("✓ Elbow heuristic chose k = {}", k);
            if args.verbose {
                for (candidate, inertia) in &curve {
                    println!("  k={:2}  inertia={:.2}", candidate, inertia);
                }
            }
            viz::create_elbow_chart(&curve, k, &args.elbow_output())?;
            k
        }
    };

    // Step 3: Lloyd k-means
    let lloyd_start = Instant::now();
    let mut rng = StdRng::seed_from_u64(seed);
    let lloyd = LloydParams::new(k)
        .max_iterations(args.max_iters)
        .tolerance(args.tolerance)
        .fit(features, &mut rng)?;
    let lloyd_time = lloyd_start.elapsed();

    println!(
        "✓ Lloyd k-means: {} iterations ({}), {:.4}s",
        lloyd.n_iterations,
        if lloyd.converged { "converged" } else { "budget exhausted" },
        lloyd_time.as_secs_f64()
    );
    if lloyd.empty_cluster_retentions > 0 {
        warn!(
            "{} empty-cluster updates kept their previous centroid",
            lloyd.empty_cluster_retentions
        );
    }

    // Step 4: Reference k-means
    let reference_start = Instant::now();
    let reference = fit_reference(features, k, &elbow_params, StdRng::seed_from_u64(seed))?;
    let reference_labels: Array1<usize> = reference.predict(&table.features);
    let reference_time = reference_start.elapsed();
    println!("✓ Reference k-means: {:.4}s", reference_time.as_secs_f64());

    // Step 5: DBSCAN with an estimated radius
    let eps = estimate_radius(features, args.neighbours)?;
    println!("✓ Estimated DBSCAN eps: {:.4}", eps);

    let dbscan_start = Instant::now();
    let memberships: Array1<Option<usize>> = Dbscan::params(args.min_samples)
        .tolerance(eps)
        .check()?
        .transform(&table.features);
    let dbscan_time = dbscan_start.elapsed();
    let noise = memberships.iter().filter(|label| label.is_none()).count();
    println!(
        "✓ DBSCAN: {} noise points, {:.4}s",
        noise,
        dbscan_time.as_secs_f64()
    );

    // Step 6: Scores
    println!("\n=== Cluster Statistics ===");
    for (i, &size) in lloyd.cluster_sizes().iter().enumerate() {
        let percentage = (size as f64 / features.nrows() as f64) * 100.0;
        println!("Cluster {}: {} samples ({:.1}%)", i, size, percentage);
    }
    println!("Within-cluster sum of squares: {:.2}", lloyd.inertia(features));
    if args.verbose {
        println!("\nCluster centroids (scaled):");
        println!("{}", centroid_table(&lloyd.centroids));
    }

    report_scores("Lloyd k-means", features, &lloyd.labels);
    report_scores("Reference k-means", features, &reference_labels);
    report_scores("DBSCAN", features, &noise_as_cluster(&memberships));

    // Step 7: Plots
    if features.ncols() >= 2 {
        let labels: Vec<Option<usize>> = lloyd.labels.iter().map(|&label| Some(label)).collect();
        viz::create_cluster_plot(
            features,
            &labels,
            Some(&lloyd.centroids),
            &args.output,
            "Lloyd k-means clusters",
        )?;
    } else {
        warn!("Skipping cluster plot: need at least two features");
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Print the three quality scores for one labeling, or why they are unavailable
fn report_scores(name: &str, features: ndarray::ArrayView2<'_, f64>, labels: &Array1<usize>) {
    println!("\n{} metrics:", name);
    let scores = silhouette_score(features, labels).and_then(|silhouette| {
        Ok((
            silhouette,
            davies_bouldin_score(features, labels)?,
            calinski_harabasz_score(features, labels)?,
        ))
    });

    match scores {
        Ok((silhouette, davies_bouldin, calinski_harabasz)) => {
            println!("  Silhouette Score: {:.4}", silhouette);
            println!("  Davies-Bouldin Score: {:.4}", davies_bouldin);
            println!("  Calinski-Harabasz Index: {:.4}", calinski_harabasz);
        }
        Err(err) => println!("  unavailable: {}", err),
    }
}

/// One line per centroid, values aligned in columns
fn centroid_table(centroids: &Array2<f64>) -> String {
    centroids
        .outer_iter()
        .enumerate()
        .map(|(i, row)| {
            let values: Vec<String> = row.iter().map(|v| format!("{:7.2}", v)).collect();
            format!("  {:7} | {}", i, values.join(" | "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
