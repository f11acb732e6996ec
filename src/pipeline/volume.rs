//! Closed-form cylinder volume estimation.
//!
//! The object is modeled as a right circular cylinder with a vertical axis.
//! The estimate is computed from the cluster's bounding extents alone, so it
//! is insensitive to point count and to residual noise inside the cluster.

use std::f64::consts::PI;

use thiserror::Error;

use crate::core::cloud::{Aabb, PointCloud};

/// Conversion factor from cubic meters to cubic centimeters.
const M3_TO_CM3: f64 = 1e6;

/// Errors that can occur during volume estimation.
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("empty input: a bounding extent is undefined for zero points")]
    EmptyInput,
}

/// Estimate the volume of a vertical cylinder from its point cloud.
///
/// Computes the axis-aligned bounding box of `cloud` and takes the cylinder
/// radius as half the larger of the two horizontal extents (tolerant of
/// partial coverage along either axis) and the height as the vertical
/// extent. Input coordinates are in meters; the result is in cubic
/// centimeters.
///
/// # Errors
///
/// Returns [`VolumeError::EmptyInput`] if the cloud has no points.
pub fn estimate_cylinder_volume(cloud: &PointCloud) -> Result<f64, VolumeError> {
    let aabb = Aabb::from_cloud(cloud);
    if aabb.is_empty() {
        return Err(VolumeError::EmptyInput);
    }

    let dx = aabb.extent(0) as f64;
    let dy = aabb.extent(1) as f64;
    let dz = aabb.extent(2) as f64;

    let radius = dx.max(dy) / 2.0;
    let height = dz;

    Ok(PI * radius * radius * height * M3_TO_CM3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_box_volume() {
        // dx = dy = dz = 1 m => r = 0.5 m, h = 1 m
        let cloud = PointCloud::from_xyz(
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 1.0, 0.5, 0.0],
        );

        let volume = estimate_cylinder_volume(&cloud).unwrap();
        let expected = PI * 0.25 * 1.0 * 1e6;
        assert!((volume - expected).abs() < 1e-3);
    }

    #[test]
    fn test_radius_uses_wider_horizontal_extent() {
        // dx = 2, dy = 1 => radius comes from dx
        let cloud = PointCloud::from_xyz(
            vec![0.0, 2.0],
            vec![0.0, 1.0],
            vec![0.0, 3.0],
        );

        let volume = estimate_cylinder_volume(&cloud).unwrap();
        let expected = PI * 1.0 * 1.0 * 3.0 * 1e6;
        assert!((volume - expected).abs() < 1e-3);
    }

    #[test]
    fn test_single_point_has_zero_volume() {
        let cloud = PointCloud::from_xyz(vec![1.0], vec![2.0], vec![3.0]);
        let volume = estimate_cylinder_volume(&cloud).unwrap();
        assert_eq!(volume, 0.0);
    }

    #[test]
    fn test_empty_input_fails() {
        let result = estimate_cylinder_volume(&PointCloud::new());
        assert!(matches!(result, Err(VolumeError::EmptyInput)));
    }

    #[test]
    fn test_scale_cubes_volume() {
        let cloud = PointCloud::from_xyz(
            vec![0.0, 0.4, 0.2],
            vec![0.0, 0.3, 0.1],
            vec![0.1, 0.5, 0.3],
        );
        let k = 2.0f32;
        let scaled = PointCloud::from_xyz(
            cloud.x.iter().map(|&v| v * k).collect(),
            cloud.y.iter().map(|&v| v * k).collect(),
            cloud.z.iter().map(|&v| v * k).collect(),
        );

        let v1 = estimate_cylinder_volume(&cloud).unwrap();
        let v2 = estimate_cylinder_volume(&scaled).unwrap();

        assert!((v2 / v1 - 8.0).abs() < 1e-4);
    }
}
