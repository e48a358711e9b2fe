//! Visualization functions using Plotters for cluster analysis

use ndarray::{Array2, ArrayView1, ArrayView2};
use plotters::prelude::*;

/// Color palette for different clusters
const CLUSTER_COLORS: [RGBColor; 8] = [
    RED,
    BLUE,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
    RGBColor(139, 69, 19),
];

/// Colour for a cluster label; `None` (noise) is drawn in black.
fn cluster_color(label: Option<usize>) -> RGBColor {
    match label {
        Some(cluster) => CLUSTER_COLORS[cluster % CLUSTER_COLORS.len()],
        None => BLACK,
    }
}

/// Min/max of a column with a fixed margin on both sides
fn padded_range(values: ArrayView1<'_, f64>, padding: f64) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        (min - padding, max + padding)
    } else {
        (-padding, padding)
    }
}

/// Scatter plot of the first two features coloured by cluster label.
///
/// # Arguments
/// * `features` - Scaled feature matrix, at least two columns
/// * `labels` - One label per row; `None` marks noise points
/// * `centroids` - Optional centroid matrix drawn as squares
/// * `output_path` - Path to save the PNG plot
/// * `title` - Plot caption
pub fn create_cluster_plot(
    features: ArrayView2<'_, f64>,
    labels: &[Option<usize>],
    centroids: Option<&Array2<f64>>,
    output_path: &str,
    title: &str,
) -> crate::Result<()> {
    if features.ncols() < 2 {
        anyhow::bail!("Need at least two features to plot, got {}", features.ncols());
    }
    if labels.len() != features.nrows() {
        anyhow::bail!(
            "Got {} labels for {} samples",
            labels.len(),
            features.nrows()
        );
    }

    let (x_min, x_max) = padded_range(features.column(0), 0.5);
    let (y_min, y_max) = padded_range(features.column(1), 0.5);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Feature 1 (scaled)")
        .y_desc("Feature 2 (scaled)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        features
            .outer_iter()
            .zip(labels)
            .map(|(row, &label)| Circle::new((row[0], row[1]), 3, cluster_color(label).filled())),
    )?;

    if let Some(centroids) = centroids {
        for (cluster_id, centroid) in centroids.outer_iter().enumerate() {
            let (cx, cy) = (centroid[0], centroid[1]);
            let color = cluster_color(Some(cluster_id));

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(cx - 0.1, cy - 0.1), (cx + 0.1, cy + 0.1)],
                    color.filled(),
                )))?
                .label(format!("Cluster {} centroid", cluster_id))
                .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    println!("Cluster plot saved to: {}", output_path);

    Ok(())
}

/// Line chart of the candidate-k inertia curve with the chosen k highlighted
pub fn create_elbow_chart(
    curve: &[(usize, f64)],
    chosen_k: usize,
    output_path: &str,
) -> crate::Result<()> {
    let (Some(&(first_k, _)), Some(&(last_k, _))) = (curve.first(), curve.last()) else {
        anyhow::bail!("Cannot chart an empty elbow curve");
    };
    let max_inertia = curve
        .iter()
        .map(|&(_, inertia)| inertia)
        .fold(0.0, f64::max);

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Elbow curve", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (first_k as f64 - 0.5)..(last_k as f64 + 0.5),
            0f64..(max_inertia * 1.1).max(1.0),
        )?;

    chart
        .configure_mesh()
        .x_desc("Number of clusters (k)")
        .y_desc("Inertia")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let points: Vec<(f64, f64)> = curve.iter().map(|&(k, inertia)| (k as f64, inertia)).collect();
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(points.iter().map(|&(k, inertia)| {
        let color = if k as usize == chosen_k { RED } else { BLUE };
        Circle::new((k, inertia), 5, color.filled())
    }))?;

    root.present()?;
    println!("Elbow chart saved to: {}", output_path);

    Ok(())
}
