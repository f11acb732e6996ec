//! Data writers for PLY and CSV formats.
//!
//! This module provides functions for exporting pipeline artifacts:
//! - ASCII PLY with RGB colors (extracted object cluster)
//! - CSV with Cartesian coordinates (segmented height band)
//! - CSV with labeled coordinates (clustering diagnostics)

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::cloud::PointCloud;

/// Default color for points when no colors are specified (light gray).
const DEFAULT_COLOR: [u8; 3] = [180, 180, 180];

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Mismatched array lengths.
    #[error("array length mismatch: coords has {coords_len} elements, labels has {labels_len} elements")]
    LengthMismatch { coords_len: usize, labels_len: usize },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a point cloud to an ASCII PLY file with RGB colors.
///
/// If the point cloud has no colors, a default light gray (180, 180, 180)
/// is used. Parent directories are created if needed.
pub fn write_ply(path: &Path, cloud: &PointCloud) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let path_str = path.display().to_string();
    let wrap = |e: std::io::Error| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    };

    let num_points = cloud.len();

    writeln!(writer, "ply").map_err(wrap)?;
    writeln!(writer, "format ascii 1.0").map_err(wrap)?;
    writeln!(writer, "element vertex {}", num_points).map_err(wrap)?;
    writeln!(writer, "property float x").map_err(wrap)?;
    writeln!(writer, "property float y").map_err(wrap)?;
    writeln!(writer, "property float z").map_err(wrap)?;
    writeln!(writer, "property uchar red").map_err(wrap)?;
    writeln!(writer, "property uchar green").map_err(wrap)?;
    writeln!(writer, "property uchar blue").map_err(wrap)?;
    writeln!(writer, "end_header").map_err(wrap)?;

    for i in 0..num_points {
        let [r, g, b] = cloud
            .colors
            .as_ref()
            .map(|c| c[i])
            .unwrap_or(DEFAULT_COLOR);

        writeln!(
            writer,
            "{:.6} {:.6} {:.6} {} {} {}",
            cloud.x[i], cloud.y[i], cloud.z[i], r, g, b
        )
        .map_err(wrap)?;
    }

    writer.flush().map_err(wrap)?;

    Ok(())
}

/// Write a point cloud to CSV with x, y, z columns.
pub fn write_cartesian_csv(path: &Path, cloud: &PointCloud) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    let path_str = path.display().to_string();
    let wrap = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer.write_record(["x", "y", "z"]).map_err(wrap)?;

    for i in 0..cloud.len() {
        csv_writer
            .write_record(&[
                format!("{:.6}", cloud.x[i]),
                format!("{:.6}", cloud.y[i]),
                format!("{:.6}", cloud.z[i]),
            ])
            .map_err(wrap)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write labeled coordinates to CSV with x, y, z, label columns.
///
/// Useful for exporting clustering results; `coords` and `labels` must have
/// equal lengths.
pub fn write_labels_csv(path: &Path, coords: &[[f32; 3]], labels: &[i32]) -> Result<()> {
    if coords.len() != labels.len() {
        return Err(WriteError::LengthMismatch {
            coords_len: coords.len(),
            labels_len: labels.len(),
        });
    }

    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    let path_str = path.display().to_string();
    let wrap = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record(["x", "y", "z", "label"])
        .map_err(wrap)?;

    for (coord, label) in coords.iter().zip(labels.iter()) {
        csv_writer
            .write_record(&[
                format!("{:.6}", coord[0]),
                format!("{:.6}", coord[1]),
                format!("{:.6}", coord[2]),
                label.to_string(),
            ])
            .map_err(wrap)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}
