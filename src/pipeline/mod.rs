//! The volume estimation pipeline.
//!
//! Stages run in a fixed order over an immutable input cloud:
//! height-band segmentation, largest-cluster extraction, closed-form
//! cylinder volume estimation. Each stage is a pure function of its input
//! and configuration; a failure in any stage aborts the run with no partial
//! result.

pub mod clustering;
pub mod segmentation;
pub mod volume;

use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::core::cloud::PointCloud;

pub use clustering::{extract_largest_cluster, ClusterError, NOISE_LABEL};
pub use segmentation::segment_height_band;
pub use volume::{estimate_cylinder_volume, VolumeError};

/// Errors that can abort a pipeline run.
///
/// All variants are terminal for a single invocation: the caller may re-run
/// with a different configuration or a new capture, but there is no retry or
/// partial-result policy.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("empty input: height band [{z_min}, {z_max}] contains no points")]
    EmptyBand { z_min: f32, z_max: f32 },

    #[error(transparent)]
    Clustering(#[from] ClusterError),

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct VolumeReport {
    /// Estimated object volume in cubic centimeters.
    pub volume_cm3: f64,
    /// The extracted object cluster, for inspection or display.
    pub object: PointCloud,
    /// Number of points that fell inside the height band.
    pub band_points: usize,
}

/// Run the full volume estimation pipeline over a point cloud.
///
/// Sequence: validate configuration, segment by height band, extract the
/// largest dense cluster, estimate the cylinder volume. Clustering runs only
/// on the height-filtered subset, which bounds its cost to the candidate
/// region.
///
/// # Errors
///
/// - [`PipelineError::InvalidConfiguration`] for unusable clustering
///   parameters (an inverted height band is tolerated and surfaces as
///   [`PipelineError::EmptyBand`] instead)
/// - [`PipelineError::EmptyBand`] when segmentation selects no points; this
///   is raised before the clustering stage runs
/// - [`PipelineError::Clustering`] when every band point is noise
/// - [`PipelineError::Volume`] from the estimation stage
pub fn estimate_volume(
    cloud: &PointCloud,
    config: &PipelineConfig,
) -> Result<VolumeReport, PipelineError> {
    config.validate()?;

    let (band, _mask) = segment_height_band(cloud, config.band.z_min, config.band.z_max);

    log::info!(
        "height band ({}, {}): {} of {} points",
        config.band.z_min,
        config.band.z_max,
        band.len(),
        cloud.len()
    );

    if band.is_empty() {
        return Err(PipelineError::EmptyBand {
            z_min: config.band.z_min,
            z_max: config.band.z_max,
        });
    }

    let object = extract_largest_cluster(&band, &config.clustering)?;
    let volume_cm3 = estimate_cylinder_volume(&object)?;

    log::info!(
        "object cluster: {} points, estimated volume {:.2} cm^3",
        object.len(),
        volume_cm3
    );

    Ok(VolumeReport {
        volume_cm3,
        band_points: band.len(),
        object,
    })
}
