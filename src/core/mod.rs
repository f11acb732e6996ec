//! Core data types and I/O operations.

pub mod cloud;
pub mod loaders;
pub mod writers;

pub use cloud::{Aabb, PointCloud, SelectionMask};
pub use loaders::{load_cloud, LoaderError};
pub use writers::{write_cartesian_csv, write_labels_csv, write_ply, WriteError};
