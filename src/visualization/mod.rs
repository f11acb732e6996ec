//! Visualization tools for point cloud data.
//!
//! This module provides 2D scatter plot rendering via the plotters library,
//! plus the [`DisplaySink`] abstraction the pipeline's callers use: display
//! is a pure sink, never on the computation path, and a volume estimate must
//! come out correct even when the sink is a no-op.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::core::cloud::PointCloud;

/// Errors that can occur during visualization.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),

    #[error("Empty point cloud")]
    EmptyPointCloud,
}

/// Result type for visualization operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
const DEFAULT_WIDTH: u32 = 1920;

/// Default plot height in pixels.
const DEFAULT_HEIGHT: u32 = 1080;

/// Color palette for cluster visualization.
const CLUSTER_COLORS: &[(u8, u8, u8)] = &[
    (228, 26, 28),   // Red
    (55, 126, 184),  // Blue
    (77, 175, 74),   // Green
    (152, 78, 163),  // Purple
    (255, 127, 0),   // Orange
    (255, 255, 51),  // Yellow
    (166, 86, 40),   // Brown
    (247, 129, 191), // Pink
    (0, 206, 209),   // Turquoise
    (138, 43, 226),  // Blue Violet
];

/// Noise color (gray) for unclustered points (label = -1).
const NOISE_COLOR: (u8, u8, u8) = (128, 128, 128);

/// A sink that renders a point cloud for visual inspection.
///
/// Sinks have no return value of interest and no effect on the pipeline's
/// numeric output; callers may inject [`NullSink`] when no display is
/// available.
pub trait DisplaySink {
    fn show(&self, cloud: &PointCloud) -> Result<()>;
}

/// A display sink that discards the cloud.
pub struct NullSink;

impl DisplaySink for NullSink {
    fn show(&self, _cloud: &PointCloud) -> Result<()> {
        Ok(())
    }
}

/// A display sink that renders a top-down PNG scatter plot.
pub struct ScatterPngSink {
    pub output_path: PathBuf,
    pub max_points: usize,
    pub alpha: f32,
}

impl ScatterPngSink {
    pub fn new<P: Into<PathBuf>>(output_path: P) -> Self {
        Self {
            output_path: output_path.into(),
            max_points: 1_000_000,
            alpha: 0.5,
        }
    }
}

impl DisplaySink for ScatterPngSink {
    fn show(&self, cloud: &PointCloud) -> Result<()> {
        plot_point_cloud(&self.output_path, cloud, self.max_points, self.alpha)
    }
}

/// Plot a 2D top-down scatter plot (x vs y) of a point cloud and save as PNG.
///
/// # Arguments
///
/// * `output_path` - Path to save the PNG image
/// * `cloud` - The point cloud to visualize
/// * `max_points` - Maximum number of points to plot (subsamples if exceeded)
/// * `alpha` - Alpha/transparency value for points (0.0 to 1.0)
pub fn plot_point_cloud(
    output_path: &Path,
    cloud: &PointCloud,
    max_points: usize,
    alpha: f32,
) -> Result<()> {
    if cloud.is_empty() {
        return Err(VisualizationError::EmptyPointCloud);
    }

    let n = cloud.len();
    let step = if n > max_points { n / max_points } else { 1 };

    let alpha_f64 = (alpha.clamp(0.0, 1.0)) as f64;

    let mut points: Vec<(f32, f32, RGBAColor)> = Vec::with_capacity(n.min(max_points));

    for i in (0..n).step_by(step) {
        let color = if let Some(ref colors) = cloud.colors {
            let c = colors[i];
            RGBAColor(c[0], c[1], c[2], alpha_f64)
        } else {
            RGBAColor(100, 149, 237, alpha_f64) // Cornflower blue default
        };

        points.push((cloud.x[i], cloud.y[i], color));
    }

    draw_scatter(output_path, &points)
}

/// Plot a 2D scatter plot of a labeled point cloud with colors by cluster.
pub fn plot_labeled_cloud(
    output_path: &Path,
    coords: &[[f32; 3]],
    labels: &[i32],
    max_points: usize,
) -> Result<()> {
    if coords.is_empty() {
        return Err(VisualizationError::EmptyPointCloud);
    }

    let n = coords.len();
    let step = if n > max_points { n / max_points } else { 1 };

    let mut points: Vec<(f32, f32, RGBAColor)> = Vec::with_capacity(n.min(max_points));

    for i in (0..n).step_by(step) {
        let label = labels[i];

        let (r, g, b) = if label < 0 {
            NOISE_COLOR
        } else {
            CLUSTER_COLORS[(label as usize) % CLUSTER_COLORS.len()]
        };

        points.push((coords[i][0], coords[i][1], RGBAColor(r, g, b, 1.0)));
    }

    draw_scatter(output_path, &points)
}

/// Render pre-colored points into a PNG scatter chart.
fn draw_scatter(output_path: &Path, points: &[(f32, f32, RGBAColor)]) -> Result<()> {
    let (x_min, x_max, y_min, y_max) = compute_bounds(points);
    let x_padding = (x_max - x_min) * 0.05;
    let y_padding = (y_max - y_min) * 0.05;

    let root =
        BitMapBackend::new(output_path, (DEFAULT_WIDTH, DEFAULT_HEIGHT)).into_drawing_area();

    root.fill(&WHITE)
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(
            (x_min - x_padding)..(x_max + x_padding),
            (y_min - y_padding)..(y_max + y_padding),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .draw()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y, color)| Circle::new((*x, *y), 2, color.filled())),
        )
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    root.present()
        .map_err(|e| VisualizationError::PlottingError(e.to_string()))?;

    Ok(())
}

/// Compute the bounds (min/max) for x and y coordinates.
fn compute_bounds(points: &[(f32, f32, RGBAColor)]) -> (f32, f32, f32, f32) {
    let mut x_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_min = f32::MAX;
    let mut y_max = f32::MIN;

    for (x, y, _) in points {
        if *x < x_min {
            x_min = *x;
        }
        if *x > x_max {
            x_max = *x;
        }
        if *y < y_min {
            y_min = *y;
        }
        if *y > y_max {
            y_max = *y;
        }
    }

    if (x_max - x_min).abs() < f32::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    if (y_max - y_min).abs() < f32::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    (x_min, x_max, y_min, y_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_is_noop() {
        let cloud = PointCloud::from_xyz(vec![1.0], vec![2.0], vec![3.0]);
        assert!(NullSink.show(&cloud).is_ok());
        // Even an empty cloud is fine for the null sink
        assert!(NullSink.show(&PointCloud::new()).is_ok());
    }

    #[test]
    fn test_plot_empty_cloud_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");

        let result = plot_point_cloud(&path, &PointCloud::new(), 1000, 0.5);
        assert!(matches!(result, Err(VisualizationError::EmptyPointCloud)));
    }

    #[test]
    fn test_scatter_png_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");

        let cloud = PointCloud::from_xyz(
            vec![0.0, 1.0, 2.0],
            vec![0.0, 1.0, 0.5],
            vec![0.0, 0.0, 0.0],
        );

        let sink = ScatterPngSink::new(&path);
        sink.show(&cloud).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_plot_labeled_cloud_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.png");

        let coords = vec![[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [5.0, 5.0, 0.0]];
        let labels = vec![0, 0, -1];

        plot_labeled_cloud(&path, &coords, &labels, 1000).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_plot_labeled_cloud_empty_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.png");

        let result = plot_labeled_cloud(&path, &[], &[], 1000);
        assert!(matches!(result, Err(VisualizationError::EmptyPointCloud)));
    }

    #[test]
    fn test_compute_bounds_degenerate() {
        let points = vec![(1.0f32, 2.0f32, RGBAColor(0, 0, 0, 1.0))];
        let (x_min, x_max, y_min, y_max) = compute_bounds(&points);

        // Degenerate extents get padded so the chart range is non-empty
        assert!(x_max > x_min);
        assert!(y_max > y_min);
    }
}
