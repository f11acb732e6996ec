//! Command-line interface for the volume pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::core::loaders::load_cloud;
use crate::core::writers::{write_cartesian_csv, write_labels_csv, write_ply};
use crate::pipeline;
use crate::visualization;

#[derive(Parser)]
#[command(name = "volume-pipeline")]
#[command(about = "Cylinder volume estimation from depth-camera point clouds", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and report the object volume in cm^3
    Estimate {
        /// Input point cloud (CSV or PLY), coordinates in meters
        input: PathBuf,
        /// Lower height-band bound in meters (exclusive)
        #[arg(long)]
        z_min: Option<f32>,
        /// Upper height-band bound in meters (exclusive)
        #[arg(long)]
        z_max: Option<f32>,
        /// Clustering neighborhood radius in meters
        #[arg(long)]
        eps: Option<f32>,
        /// Minimum points for a group to count as a cluster
        #[arg(long)]
        min_cluster_size: Option<usize>,
        /// Minimum neighborhood density for a cluster core
        #[arg(long)]
        min_samples: Option<usize>,
        /// Write the extracted object cluster to a PLY file
        #[arg(long)]
        export_cluster: Option<PathBuf>,
        /// Write a top-down PNG scatter plot of the extracted cluster
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Filter a point cloud to the configured height band and export as CSV
    Segment {
        /// Input point cloud (CSV or PLY)
        input: PathBuf,
        /// Output CSV path
        output: PathBuf,
        /// Lower height-band bound in meters (exclusive)
        #[arg(long)]
        z_min: Option<f32>,
        /// Upper height-band bound in meters (exclusive)
        #[arg(long)]
        z_max: Option<f32>,
    },

    /// Run density clustering and export labeled coordinates as CSV
    Cluster {
        /// Input point cloud (CSV or PLY)
        input: PathBuf,
        /// Output CSV path (defaults to input name with _labels.csv suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Clustering neighborhood radius in meters
        #[arg(long)]
        eps: Option<f32>,
        /// Minimum points for a group to count as a cluster
        #[arg(long)]
        min_cluster_size: Option<usize>,
        /// Minimum neighborhood density for a cluster core
        #[arg(long)]
        min_samples: Option<usize>,
        /// Write a top-down PNG scatter plot colored by cluster label
        #[arg(long)]
        plot: Option<PathBuf>,
    },

    /// Render a point cloud as a 2D scatter plot (PNG)
    Visualize {
        /// Input point cloud (CSV or PLY)
        input: PathBuf,
        /// Output PNG file path (defaults to input name with .png extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Maximum number of points to plot (subsamples if exceeded)
        #[arg(long, default_value_t = 1_000_000)]
        max_points: usize,
        /// Alpha/transparency value for points (0.0 to 1.0)
        #[arg(long, default_value_t = 0.5)]
        alpha: f32,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Truncate a summary value to fit the box, respecting char boundaries.
fn truncate_value(value: &str, max_chars: usize) -> String {
    if value.chars().count() > max_chars {
        let head: String = value.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        println!("║ {:<20}: {:<39} ║", key, truncate_value(value, 39));
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Estimate {
            input,
            z_min,
            z_max,
            eps,
            min_cluster_size,
            min_samples,
            export_cluster,
            plot,
        } => {
            let mut config = config;
            config.band.z_min = z_min.unwrap_or(config.band.z_min);
            config.band.z_max = z_max.unwrap_or(config.band.z_max);
            config.clustering.eps = eps.unwrap_or(config.clustering.eps);
            config.clustering.min_cluster_size =
                min_cluster_size.unwrap_or(config.clustering.min_cluster_size);
            config.clustering.min_samples = min_samples.unwrap_or(config.clustering.min_samples);

            cmd_estimate(&input, &config, export_cluster, plot);
        }
        Commands::Segment {
            input,
            output,
            z_min,
            z_max,
        } => {
            let z_min = z_min.unwrap_or(config.band.z_min);
            let z_max = z_max.unwrap_or(config.band.z_max);
            cmd_segment(&input, &output, z_min, z_max);
        }
        Commands::Cluster {
            input,
            output,
            eps,
            min_cluster_size,
            min_samples,
            plot,
        } => {
            let mut clustering = config.clustering;
            clustering.eps = eps.unwrap_or(clustering.eps);
            clustering.min_cluster_size = min_cluster_size.unwrap_or(clustering.min_cluster_size);
            clustering.min_samples = min_samples.unwrap_or(clustering.min_samples);

            cmd_cluster(&input, output, &clustering, plot);
        }
        Commands::Visualize {
            input,
            output,
            max_points,
            alpha,
        } => {
            cmd_visualize(&input, output, max_points, alpha);
        }
    }
}

fn cmd_estimate(
    input: &PathBuf,
    config: &PipelineConfig,
    export_cluster: Option<PathBuf>,
    plot: Option<PathBuf>,
) {
    let start = Instant::now();

    println!("Estimating object volume...");
    println!("Input: {}", input.display());
    println!("Parameters:");
    println!("  z_min: {} m", config.band.z_min);
    println!("  z_max: {} m", config.band.z_max);
    println!("  eps: {} m", config.clustering.eps);
    println!("  min_cluster_size: {}", config.clustering.min_cluster_size);
    println!("  min_samples: {}", config.clustering.min_samples);

    let spinner = create_spinner("Loading point cloud...");

    let cloud = match load_cloud(input) {
        Ok(c) => c,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load point cloud: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Running volume pipeline...");

    let report = match pipeline::estimate_volume(&cloud, config) {
        Ok(r) => r,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Volume estimation failed: {}", e);
            std::process::exit(1);
        }
    };

    spinner.finish_and_clear();

    if let Some(path) = export_cluster {
        if let Err(e) = write_ply(&path, &report.object) {
            error!("Failed to export cluster PLY: {}", e);
        } else {
            info!("Cluster PLY -> {}", path.display());
        }
    }

    if let Some(path) = plot {
        use crate::visualization::{DisplaySink, ScatterPngSink};
        let sink = ScatterPngSink::new(&path);
        if let Err(e) = sink.show(&report.object) {
            warn!("Failed to plot cluster: {}", e);
        } else {
            info!("Cluster plot -> {}", path.display());
        }
    }

    print_summary(
        "Volume Estimation Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Points loaded", cloud.len().to_string()),
            ("Band points", report.band_points.to_string()),
            ("Cluster points", report.object.len().to_string()),
            ("Volume", format!("{:.2} cm^3", report.volume_cm3)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_segment(input: &PathBuf, output: &PathBuf, z_min: f32, z_max: f32) {
    let start = Instant::now();

    let spinner = create_spinner("Segmenting height band...");

    let cloud = match load_cloud(input) {
        Ok(c) => c,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load point cloud: {}", e);
            std::process::exit(1);
        }
    };

    let (band, _mask) = pipeline::segment_height_band(&cloud, z_min, z_max);

    if let Err(e) = write_cartesian_csv(output, &band) {
        spinner.finish_and_clear();
        error!("Failed to write band CSV: {}", e);
        std::process::exit(1);
    }

    spinner.finish_and_clear();

    print_summary(
        "Height Segmentation Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output CSV", output.display().to_string()),
            ("Points in", cloud.len().to_string()),
            ("Points in band", band.len().to_string()),
            ("Band", format!("({}, {}) m", z_min, z_max)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_cluster(
    input: &PathBuf,
    output: Option<PathBuf>,
    clustering: &crate::config::ClusteringConfig,
    plot: Option<PathBuf>,
) {
    let start = Instant::now();

    let output = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        input.with_file_name(format!("{}_labels.csv", stem))
    });

    println!("Running density clustering...");
    println!("Input: {}", input.display());
    println!("Output: {}", output.display());

    let spinner = create_spinner("Clustering point cloud...");

    let cloud = match load_cloud(input) {
        Ok(c) => c,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load point cloud: {}", e);
            std::process::exit(1);
        }
    };

    let coords = cloud.to_coords();
    let mut labels =
        pipeline::clustering::dbscan_labels(&coords, clustering.eps, clustering.min_samples);
    pipeline::clustering::suppress_small_clusters(&mut labels, clustering.min_cluster_size);

    if let Err(e) = write_labels_csv(&output, &coords, &labels) {
        spinner.finish_and_clear();
        error!("Failed to write labels CSV: {}", e);
        std::process::exit(1);
    }

    spinner.finish_and_clear();

    if let Some(path) = plot {
        if let Err(e) = visualization::plot_labeled_cloud(&path, &coords, &labels, 1_000_000) {
            warn!("Failed to plot labeled clusters: {}", e);
        } else {
            info!("Cluster plot -> {}", path.display());
        }
    }

    let noise_count = labels.iter().filter(|&&l| l == pipeline::NOISE_LABEL).count();
    let cluster_count = pipeline::clustering::cluster_count(&labels);

    print_summary(
        "Clustering Complete",
        &[
            ("Input file", input.display().to_string()),
            ("Output CSV", output.display().to_string()),
            ("Points processed", labels.len().to_string()),
            ("Clusters found", cluster_count.to_string()),
            ("Noise points", noise_count.to_string()),
            ("eps", clustering.eps.to_string()),
            ("min_samples", clustering.min_samples.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_visualize(input: &PathBuf, output: Option<PathBuf>, max_points: usize, alpha: f32) {
    let start = Instant::now();

    let output_path = output.unwrap_or_else(|| {
        let mut path = input.clone();
        path.set_extension("png");
        path
    });

    println!("Visualizing point cloud...");
    println!("Input: {}", input.display());
    println!("Output: {}", output_path.display());

    let spinner = create_spinner("Loading point cloud...");

    let cloud = match load_cloud(input) {
        Ok(c) => c,
        Err(e) => {
            spinner.finish_and_clear();
            error!("Failed to load point cloud: {}", e);
            std::process::exit(1);
        }
    };

    spinner.set_message("Generating plot...");

    match visualization::plot_point_cloud(&output_path, &cloud, max_points, alpha) {
        Ok(()) => {
            spinner.finish_and_clear();

            print_summary(
                "Visualization Complete",
                &[
                    ("Input file", input.display().to_string()),
                    ("Output PNG", output_path.display().to_string()),
                    ("Points in cloud", cloud.len().to_string()),
                    ("Max points plotted", max_points.to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            error!("Visualization failed: {}", e);
            std::process::exit(1);
        }
    }
}
