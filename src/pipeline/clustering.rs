//! Density clustering for object extraction.
//!
//! This module implements a parallelized DBSCAN over 3D coordinates using:
//! - `kiddo` KD-tree for O(log n) spatial neighbor queries
//! - `rayon` for parallel neighbor finding and core point identification
//! - Atomic union-find for lock-free cluster merging
//!
//! Clusters smaller than `min_cluster_size` are relabeled as noise, and the
//! largest surviving cluster is taken to be the physical object.
//!
//! # Example
//!
//! ```
//! use volume_pipeline::pipeline::clustering::dbscan_labels;
//!
//! let coords = vec![[0.0f32, 0.0, 0.0], [0.005, 0.0, 0.0], [1.0, 1.0, 1.0]];
//! let labels = dbscan_labels(&coords, 0.01, 2);
//! assert_eq!(labels, vec![0, 0, -1]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::ClusteringConfig;
use crate::core::cloud::PointCloud;

/// Label value marking points that belong to no dense group.
pub const NOISE_LABEL: i32 = -1;

/// Errors that can occur during cluster extraction.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("empty input: clustering requires at least one point")]
    EmptyInput,

    #[error("no cluster found: every point was labeled as noise")]
    NoClusterFound,
}

/// Atomic Union-Find data structure for lock-free parallel cluster merging.
///
/// Uses path compression with atomic compare-and-swap operations to safely
/// merge clusters from multiple threads without locks. The merge rule
/// (smaller root points to larger root) makes the final root of each
/// component the component's largest index, independent of thread
/// interleaving, so labels are deterministic for fixed input.
pub struct AtomicUnionFind {
    parent: Vec<AtomicUsize>,
}

impl AtomicUnionFind {
    /// Create a new union-find structure where each element is its own parent.
    #[inline]
    pub fn new(size: usize) -> Self {
        let parent = (0..size).map(AtomicUsize::new).collect();
        Self { parent }
    }

    /// Find the root of the set containing `x` with path compression.
    #[inline]
    pub fn find(&self, mut x: usize) -> usize {
        loop {
            let p = self.parent[x].load(Ordering::Relaxed);
            if p == x {
                return x;
            }
            // Path compression: try to point x directly to grandparent
            let gp = self.parent[p].load(Ordering::Relaxed);
            if gp != p {
                // Fine if this fails due to a concurrent update
                let _ =
                    self.parent[x].compare_exchange_weak(p, gp, Ordering::Relaxed, Ordering::Relaxed);
            }
            x = p;
        }
    }

    /// Union the sets containing `x` and `y`.
    ///
    /// Returns true if a merge actually occurred, false if they were already
    /// in the same set.
    #[inline]
    pub fn union(&self, x: usize, y: usize) -> bool {
        loop {
            let root_x = self.find(x);
            let root_y = self.find(y);

            if root_x == root_y {
                return false;
            }

            // Always make the smaller root point to the larger root
            let (small, large) = if root_x < root_y {
                (root_x, root_y)
            } else {
                (root_y, root_x)
            };

            match self.parent[small].compare_exchange_weak(
                small,
                large,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(_) => continue, // Retry if another thread modified it
            }
        }
    }
}

/// DBSCAN clustering over 3D coordinates.
///
/// Points are neighbors if they are within `eps` of each other. A core point
/// has at least `min_samples` neighbors (the point itself counts, matching
/// the standard formulation). Clusters are formed by connecting core points
/// that are neighbors; non-core points attach to the first core neighbor or
/// become noise.
///
/// # Algorithm (Parallelized)
///
/// 1. Build a KD-tree over the coordinates
/// 2. Parallel radius queries for each point's neighbors within `eps`
/// 3. Parallel core point identification
/// 4. Lock-free cluster formation via atomic union-find over core points
/// 5. Sequential label assignment from union-find roots; noise gets -1
///
/// # Returns
///
/// Vector of cluster labels (-1 for noise points), deterministic for fixed
/// inputs and parameters.
pub fn dbscan_labels(coords: &[[f32; 3]], eps: f32, min_samples: usize) -> Vec<i32> {
    let n = coords.len();
    if n == 0 {
        return Vec::new();
    }

    let tree: ImmutableKdTree<f32, 3> = ImmutableKdTree::new_from_slice(coords);

    let eps_sq = eps * eps;

    // Radius queries include the query point itself (distance 0)
    let neighbors: Vec<Vec<usize>> = coords
        .par_iter()
        .map(|coord| {
            tree.within::<SquaredEuclidean>(coord, eps_sq)
                .iter()
                .map(|nn| nn.item as usize)
                .collect()
        })
        .collect();

    let is_core: Vec<bool> = neighbors
        .par_iter()
        .map(|neigh| neigh.len() >= min_samples)
        .collect();

    let uf = AtomicUnionFind::new(n);

    (0..n).into_par_iter().for_each(|i| {
        if is_core[i] {
            for &j in &neighbors[i] {
                if is_core[j] {
                    uf.union(i, j);
                }
            }
        }
    });

    // Map union-find roots to sequential cluster IDs, in index order so the
    // numbering does not depend on scheduling
    let mut root_to_cluster: HashMap<usize, i32> = HashMap::new();
    let mut next_cluster_id: i32 = 0;

    for i in 0..n {
        if is_core[i] {
            let root = uf.find(i);
            root_to_cluster.entry(root).or_insert_with(|| {
                let id = next_cluster_id;
                next_cluster_id += 1;
                id
            });
        }
    }

    let mut labels = vec![NOISE_LABEL; n];

    for i in 0..n {
        if is_core[i] {
            let root = uf.find(i);
            labels[i] = root_to_cluster[&root];
        } else {
            // Border point: attach to the first core neighbor, if any
            for &j in &neighbors[i] {
                if is_core[j] {
                    let root = uf.find(j);
                    labels[i] = root_to_cluster[&root];
                    break;
                }
            }
        }
    }

    labels
}

/// Relabel clusters smaller than `min_cluster_size` as noise.
///
/// Surviving labels keep their original values, so the labeling may have
/// gaps; clusters are identified by value equality, not contiguity.
pub fn suppress_small_clusters(labels: &mut [i32], min_cluster_size: usize) {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for &label in labels.iter() {
        if label != NOISE_LABEL {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    for label in labels.iter_mut() {
        if *label != NOISE_LABEL && counts[label] < min_cluster_size {
            *label = NOISE_LABEL;
        }
    }
}

/// Number of distinct non-noise cluster labels.
///
/// Labelings may have gaps after small-cluster suppression, so the count is
/// over distinct values, not the maximum label.
pub fn cluster_count(labels: &[i32]) -> usize {
    let distinct: HashSet<i32> = labels
        .iter()
        .copied()
        .filter(|&l| l != NOISE_LABEL)
        .collect();
    distinct.len()
}

/// Pick the label of the largest non-noise cluster.
///
/// Ties are broken by the lowest label value (first maximum). Returns `None`
/// when every point is noise.
pub fn largest_cluster_label(labels: &[i32]) -> Option<i32> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for &label in labels {
        if label != NOISE_LABEL {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(i32, usize)> = counts.into_iter().collect();
    sorted.sort_unstable_by_key(|&(label, _)| label);

    let mut best: Option<(i32, usize)> = None;
    for (label, count) in sorted {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }

    best.map(|(label, _)| label)
}

/// Cluster a point cloud and return the single largest dense cluster.
///
/// Runs DBSCAN with `config.eps` / `config.min_samples`, suppresses clusters
/// smaller than `config.min_cluster_size`, then selects the largest
/// surviving cluster (lowest label wins ties). The returned cloud contains
/// exactly the points carrying that label, in input order.
///
/// # Errors
///
/// - [`ClusterError::EmptyInput`] if `cloud` has no points
/// - [`ClusterError::NoClusterFound`] if every point is labeled noise
pub fn extract_largest_cluster(
    cloud: &PointCloud,
    config: &ClusteringConfig,
) -> Result<PointCloud, ClusterError> {
    if cloud.is_empty() {
        return Err(ClusterError::EmptyInput);
    }

    let coords = cloud.to_coords();
    let mut labels = dbscan_labels(&coords, config.eps, config.min_samples);
    suppress_small_clusters(&mut labels, config.min_cluster_size);

    let target = largest_cluster_label(&labels).ok_or(ClusterError::NoClusterFound)?;

    let indices: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter_map(|(i, &label)| if label == target { Some(i) } else { None })
        .collect();

    log::debug!(
        "selected cluster {} with {} of {} points",
        target,
        indices.len(),
        cloud.len()
    );

    Ok(cloud.select(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_union_find_basic() {
        let uf = AtomicUnionFind::new(5);

        assert_eq!(uf.find(0), 0);
        assert_eq!(uf.find(4), 4);

        assert!(uf.union(0, 1));
        assert_eq!(uf.find(0), uf.find(1));

        assert!(uf.union(2, 3));
        assert_ne!(uf.find(0), uf.find(2));

        assert!(uf.union(1, 2));
        assert_eq!(uf.find(0), uf.find(3));

        // Union of same set returns false
        assert!(!uf.union(0, 3));
    }

    #[test]
    fn test_dbscan_two_clusters() {
        let coords: Vec<[f32; 3]> = vec![
            // Cluster around origin
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            [0.5, 0.5, 0.0],
            // Cluster far away
            [100.0, 100.0, 0.0],
            [100.5, 100.0, 0.0],
            [100.0, 100.5, 0.0],
        ];

        let labels = dbscan_labels(&coords, 1.0, 2);

        assert_eq!(labels.len(), 7);
        assert!(labels[0] >= 0);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[0], labels[3]);

        assert!(labels[4] >= 0);
        assert_eq!(labels[4], labels[5]);
        assert_eq!(labels[4], labels[6]);

        assert_ne!(labels[0], labels[4]);
    }

    #[test]
    fn test_dbscan_noise_points() {
        let coords: Vec<[f32; 3]> = vec![
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [0.0, 0.5, 0.0],
            // Isolated point
            [100.0, 100.0, 100.0],
        ];

        let labels = dbscan_labels(&coords, 1.0, 3);

        assert!(labels[0] >= 0);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], NOISE_LABEL);
    }

    #[test]
    fn test_dbscan_min_samples_one_connects_components() {
        // With min_samples = 1 every point is core; clusters are the
        // eps-connected components
        let coords: Vec<[f32; 3]> = vec![
            [0.0, 0.0, 0.0],
            [0.5, 0.0, 0.0],
            [10.0, 0.0, 0.0],
        ];

        let labels = dbscan_labels(&coords, 1.0, 1);

        assert_eq!(labels[0], labels[1]);
        assert!(labels[2] >= 0);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_dbscan_empty() {
        let coords: Vec<[f32; 3]> = vec![];
        assert!(dbscan_labels(&coords, 1.0, 3).is_empty());
    }

    #[test]
    fn test_dbscan_deterministic() {
        let coords: Vec<[f32; 3]> = (0..200)
            .map(|i| {
                let t = i as f32 * 0.01;
                [t, (t * 7.0).sin() * 0.1, (t * 3.0).cos() * 0.1]
            })
            .collect();

        let a = dbscan_labels(&coords, 0.05, 3);
        let b = dbscan_labels(&coords, 0.05, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_suppress_small_clusters() {
        let mut labels = vec![0, 0, 0, 1, 1, NOISE_LABEL];
        suppress_small_clusters(&mut labels, 3);

        assert_eq!(labels, vec![0, 0, 0, NOISE_LABEL, NOISE_LABEL, NOISE_LABEL]);
    }

    #[test]
    fn test_cluster_count_ignores_label_gaps() {
        // Suppression can leave non-contiguous labels behind
        let labels = vec![2, 2, 2, NOISE_LABEL, 5, 5];
        assert_eq!(cluster_count(&labels), 2);

        assert_eq!(cluster_count(&[NOISE_LABEL; 3]), 0);
        assert_eq!(cluster_count(&[]), 0);
    }

    #[test]
    fn test_largest_cluster_label_tie_breaks_low() {
        let labels = vec![2, 2, 0, 0, NOISE_LABEL];
        assert_eq!(largest_cluster_label(&labels), Some(0));
    }

    #[test]
    fn test_largest_cluster_label_all_noise() {
        let labels = vec![NOISE_LABEL; 4];
        assert_eq!(largest_cluster_label(&labels), None);
    }

    #[test]
    fn test_extract_largest_cluster() {
        // Dense group of 5 plus a pair too small to survive min_cluster_size
        let cloud = PointCloud::from_xyz(
            vec![0.0, 0.01, 0.02, 0.01, 0.02, 5.0, 5.01],
            vec![0.0, 0.0, 0.0, 0.01, 0.01, 0.0, 0.0],
            vec![0.05; 7],
        );

        let config = ClusteringConfig {
            eps: 0.05,
            min_cluster_size: 3,
            min_samples: 1,
        };

        let object = extract_largest_cluster(&cloud, &config).unwrap();
        assert_eq!(object.len(), 5);
        assert!(object.x.iter().all(|&x| x < 1.0));
    }

    #[test]
    fn test_extract_largest_cluster_empty_input() {
        let config = ClusteringConfig::default();
        let result = extract_largest_cluster(&PointCloud::new(), &config);
        assert!(matches!(result, Err(ClusterError::EmptyInput)));
    }

    #[test]
    fn test_extract_largest_cluster_all_noise() {
        // Points far sparser than eps
        let cloud = PointCloud::from_xyz(
            vec![0.0, 10.0, 20.0, 30.0],
            vec![0.0, 10.0, 20.0, 30.0],
            vec![0.0, 10.0, 20.0, 30.0],
        );

        let config = ClusteringConfig {
            eps: 0.01,
            min_cluster_size: 2,
            min_samples: 2,
        };

        let result = extract_largest_cluster(&cloud, &config);
        assert!(matches!(result, Err(ClusterError::NoClusterFound)));
    }
}
