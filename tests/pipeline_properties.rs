//! End-to-end properties of the volume estimation pipeline.

use std::f32::consts::TAU;

use volume_pipeline::config::{BandConfig, ClusteringConfig, PipelineConfig};
use volume_pipeline::core::cloud::PointCloud;
use volume_pipeline::pipeline::{
    estimate_volume, segment_height_band, ClusterError, PipelineError,
};

/// Sample the lateral surface of a vertical cylinder on a regular grid.
///
/// Radius and height in meters; the base sits at z = 0.
fn cylinder_surface(radius: f32, height: f32, angle_steps: usize, height_steps: usize) -> PointCloud {
    let mut cloud = PointCloud::with_capacity(angle_steps * (height_steps + 1));

    for i in 0..angle_steps {
        let theta = i as f32 * TAU / angle_steps as f32;
        let (sin_t, cos_t) = theta.sin_cos();

        for j in 0..=height_steps {
            let z = j as f32 * height / height_steps as f32;
            cloud.push(radius * cos_t, radius * sin_t, z);
        }
    }

    cloud
}

/// Deterministic LCG, for reproducible pseudo-random point scatter.
fn lcg_f32(state: &mut u64) -> f32 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    ((*state >> 33) as f32) / (u32::MAX as f32 / 2.0)
}

fn scale_cloud(cloud: &PointCloud, k: f32) -> PointCloud {
    PointCloud::from_xyz(
        cloud.x.iter().map(|&v| v * k).collect(),
        cloud.y.iter().map(|&v| v * k).collect(),
        cloud.z.iter().map(|&v| v * k).collect(),
    )
}

fn cylinder_config() -> PipelineConfig {
    PipelineConfig {
        band: BandConfig {
            z_min: -1.0,
            z_max: 6.0,
        },
        clustering: ClusteringConfig {
            eps: 0.15,
            min_cluster_size: 15,
            min_samples: 1,
        },
    }
}

#[test]
fn known_geometry_round_trip() {
    // r = 1 m, h = 5 m, band covering the full cylinder
    let cloud = cylinder_surface(1.0, 5.0, 120, 50);
    let report = estimate_volume(&cloud, &cylinder_config()).unwrap();

    let expected = std::f64::consts::PI * 1.0 * 1.0 * 5.0 * 1e6;
    let relative_error = (report.volume_cm3 - expected).abs() / expected;

    assert!(
        relative_error < 0.10,
        "volume {:.2} cm^3 deviates {:.1}% from expected {:.2} cm^3",
        report.volume_cm3,
        relative_error * 100.0,
        expected
    );

    // The whole surface is one dense cluster
    assert_eq!(report.object.len(), cloud.len());
}

#[test]
fn pipeline_is_idempotent() {
    let cloud = cylinder_surface(0.5, 2.0, 80, 30);
    let config = cylinder_config();

    let first = estimate_volume(&cloud, &config).unwrap();
    let second = estimate_volume(&cloud, &config).unwrap();

    assert_eq!(first.volume_cm3, second.volume_cm3);
    assert_eq!(first.object.len(), second.object.len());
    assert_eq!(first.object.x, second.object.x);
}

#[test]
fn volume_scales_cubically() {
    let cloud = cylinder_surface(1.0, 5.0, 120, 50);
    let shrunk = scale_cloud(&cloud, 0.5);

    // Same configuration in absolute units for both runs
    let config = cylinder_config();

    let v_full = estimate_volume(&cloud, &config).unwrap().volume_cm3;
    let v_half = estimate_volume(&shrunk, &config).unwrap().volume_cm3;

    let ratio = v_half / v_full;
    assert!(
        (ratio - 0.125).abs() < 1e-3,
        "expected k^3 = 0.125, got {}",
        ratio
    );
}

#[test]
fn mask_reproduces_segmented_cloud() {
    let mut state = 7u64;
    let mut cloud = PointCloud::with_capacity(500);
    for _ in 0..500 {
        cloud.push(
            lcg_f32(&mut state),
            lcg_f32(&mut state),
            lcg_f32(&mut state) * 0.2,
        );
    }

    let (band, mask) = segment_height_band(&cloud, 0.05, 0.15);

    assert_eq!(mask.len(), cloud.len());
    let reapplied = cloud.filter_by_mask(&mask);
    assert_eq!(reapplied.x, band.x);
    assert_eq!(reapplied.y, band.y);
    assert_eq!(reapplied.z, band.z);
}

#[test]
fn boundary_points_are_excluded() {
    let cloud = PointCloud::from_xyz(
        vec![0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0],
        vec![0.01, 0.05, 0.12],
    );

    let (band, _) = segment_height_band(&cloud, 0.01, 0.12);

    // Points exactly at z_min and z_max fall outside the open interval
    assert_eq!(band.len(), 1);
    assert_eq!(band.z, vec![0.05]);
}

#[test]
fn degenerate_band_fails_with_empty_input() {
    let cloud = cylinder_surface(0.05, 0.1, 40, 10);

    let mut config = PipelineConfig::default();
    config.band.z_min = 0.05;
    config.band.z_max = 0.05;

    let result = estimate_volume(&cloud, &config);
    assert!(matches!(result, Err(PipelineError::EmptyBand { .. })));

    config.band.z_min = 0.12;
    config.band.z_max = 0.01;
    let result = estimate_volume(&cloud, &config);
    assert!(matches!(result, Err(PipelineError::EmptyBand { .. })));
}

#[test]
fn sparse_noise_fails_with_no_cluster() {
    // 100 points scattered over 50 m x 50 m, far below clustering density
    let mut state = 42u64;
    let mut cloud = PointCloud::with_capacity(100);
    for _ in 0..100 {
        cloud.push(
            lcg_f32(&mut state) * 50.0,
            lcg_f32(&mut state) * 50.0,
            0.02 + lcg_f32(&mut state) * 0.04,
        );
    }

    let config = PipelineConfig {
        band: BandConfig {
            z_min: 0.01,
            z_max: 0.12,
        },
        clustering: ClusteringConfig {
            eps: 0.01,
            min_cluster_size: 15,
            min_samples: 2,
        },
    };

    let result = estimate_volume(&cloud, &config);
    assert!(matches!(
        result,
        Err(PipelineError::Clustering(ClusterError::NoClusterFound))
    ));
}

#[test]
fn invalid_parameters_are_rejected_before_running() {
    let cloud = cylinder_surface(1.0, 5.0, 40, 10);

    for bad in [
        PipelineConfig {
            clustering: ClusteringConfig {
                min_cluster_size: 0,
                ..Default::default()
            },
            ..Default::default()
        },
        PipelineConfig {
            clustering: ClusteringConfig {
                min_samples: 0,
                ..Default::default()
            },
            ..Default::default()
        },
        PipelineConfig {
            clustering: ClusteringConfig {
                eps: -0.5,
                ..Default::default()
            },
            ..Default::default()
        },
    ] {
        let result = estimate_volume(&cloud, &bad);
        assert!(matches!(
            result,
            Err(PipelineError::InvalidConfiguration(_))
        ));
    }
}
