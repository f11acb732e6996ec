//! Volume estimation for depth-camera point cloud captures.
//!
//! This crate provides tools for:
//! - Loading Cartesian CSV and ASCII PLY point cloud files (coordinates in meters)
//! - Height-band segmentation above a reference surface
//! - DBSCAN density clustering to isolate the object from background/noise
//! - Closed-form cylinder volume estimation in cubic centimeters
//!
//! # Example
//!
//! ```no_run
//! use volume_pipeline::{config::PipelineConfig, core::loaders::load_cloud, pipeline};
//!
//! let cloud = load_cloud("capture.ply").unwrap();
//! let report = pipeline::estimate_volume(&cloud, &PipelineConfig::default()).unwrap();
//! println!("{:.2} cm^3", report.volume_cm3);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod visualization;

pub use crate::config::{BandConfig, ClusteringConfig, PipelineConfig};
pub use crate::core::cloud::{PointCloud, SelectionMask};
pub use crate::pipeline::{estimate_volume, PipelineError, VolumeReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
