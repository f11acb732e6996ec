//! Configuration types for the volume estimation pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use thiserror::Error;

/// Errors raised when a configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for height-band segmentation.
///
/// The band is an open interval: points with `z_min < z < z_max` are
/// retained, boundary points are excluded. An inverted band (`z_min >=
/// z_max`) is tolerated and simply selects nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandConfig {
    /// Lower bound of the height band in meters (exclusive)
    #[serde(default = "default_z_min")]
    pub z_min: f32,

    /// Upper bound of the height band in meters (exclusive)
    #[serde(default = "default_z_max")]
    pub z_max: f32,
}

fn default_z_min() -> f32 {
    0.01
}

fn default_z_max() -> f32 {
    0.12
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            z_min: default_z_min(),
            z_max: default_z_max(),
        }
    }
}

/// Configuration for density clustering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Neighborhood radius in meters
    #[serde(default = "default_eps")]
    pub eps: f32,

    /// Minimum points for a group to count as a cluster
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,

    /// Minimum neighborhood density for a point to be a cluster core
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_eps() -> f32 {
    0.01
}

fn default_min_cluster_size() -> usize {
    15
}

fn default_min_samples() -> usize {
    1
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_cluster_size: default_min_cluster_size(),
            min_samples: default_min_samples(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub band: BandConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject parameter values the clustering stage cannot work with.
    ///
    /// An inverted height band is deliberately not rejected here: it selects
    /// nothing and surfaces as an empty-input failure downstream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clustering.min_cluster_size == 0 {
            return Err(ConfigError::Invalid(
                "min_cluster_size must be at least 1".to_string(),
            ));
        }
        if self.clustering.min_samples == 0 {
            return Err(ConfigError::Invalid(
                "min_samples must be at least 1".to_string(),
            ));
        }
        if !(self.clustering.eps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "eps must be positive, got {}",
                self.clustering.eps
            )));
        }
        Ok(())
    }
}
