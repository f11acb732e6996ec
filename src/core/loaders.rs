//! Data loaders for point cloud captures.
//!
//! This module provides parsers for:
//! - Cartesian CSV files (x, y, z columns, or bare 3-column numeric rows)
//! - ASCII PLY point cloud files (with optional RGB colors)
//!
//! All coordinates are expected in meters, in a calibrated metric frame.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use super::cloud::PointCloud;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(PathBuf),

    #[error("Invalid point matrix shape: {rows} rows x {cols} columns (expected N x 3 or 3 x N)")]
    InvalidShape { rows: usize, cols: usize },

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Normalize a numeric coordinate matrix to a point cloud.
///
/// Accepts either `(N, 3)` row-per-point layout or `(3, N)` row-per-axis
/// layout; the orientation is auto-detected from the row widths. Ragged or
/// otherwise incompatible matrices are rejected.
pub fn cloud_from_matrix(matrix: &[Vec<f32>]) -> Result<PointCloud> {
    if matrix.is_empty() {
        return Ok(PointCloud::new());
    }

    let rows = matrix.len();
    let cols = matrix[0].len();

    if matrix.iter().any(|row| row.len() != cols) {
        return Err(LoaderError::ParseError(
            "ragged coordinate matrix".to_string(),
        ));
    }

    // (N, 3): one point per row. A 3x3 matrix is ambiguous; row-per-point wins.
    if cols == 3 {
        let mut cloud = PointCloud::with_capacity(rows);
        for row in matrix {
            cloud.push(row[0], row[1], row[2]);
        }
        return Ok(cloud);
    }

    // (3, N): one axis per row, transpose.
    if rows == 3 {
        let mut cloud = PointCloud::with_capacity(cols);
        for i in 0..cols {
            cloud.push(matrix[0][i], matrix[1][i], matrix[2][i]);
        }
        return Ok(cloud);
    }

    Err(LoaderError::InvalidShape { rows, cols })
}

/// Load a Cartesian point cloud from a CSV file.
///
/// If the file starts with a header row, columns named `x`, `y`, `z`
/// (case-insensitive) are used, falling back to the first three columns.
/// Headerless all-numeric files are loaded as a coordinate matrix and
/// normalized via [`cloud_from_matrix`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unusable shape,
/// or contains no points.
pub fn load_cartesian_csv<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut records = reader.records();

    let first = match records.next() {
        Some(r) => r?,
        None => return Err(LoaderError::EmptyFile(path.to_path_buf())),
    };

    let first_is_header = first.iter().any(|f| f.trim().parse::<f32>().is_err());

    if first_is_header {
        // Map header names to column indices, defaulting to the first three.
        let col_map: HashMap<String, usize> = first
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_lowercase(), i))
            .collect();

        let x_idx = col_map.get("x").copied().unwrap_or(0);
        let y_idx = col_map.get("y").copied().unwrap_or(1);
        let z_idx = col_map.get("z").copied().unwrap_or(2);

        let mut cloud = PointCloud::with_capacity(10_000);

        for result in records {
            let record = result?;
            let parse = |idx: usize| -> Option<f32> {
                record.get(idx).and_then(|s| s.trim().parse().ok())
            };

            if let (Some(x), Some(y), Some(z)) = (parse(x_idx), parse(y_idx), parse(z_idx)) {
                cloud.push(x, y, z);
            }
        }

        if cloud.is_empty() {
            return Err(LoaderError::EmptyFile(path.to_path_buf()));
        }

        Ok(cloud)
    } else {
        // Headerless numeric file: collect the full matrix and auto-detect
        // (N, 3) vs (3, N) orientation.
        let mut matrix: Vec<Vec<f32>> = Vec::with_capacity(10_000);

        let first_row: Vec<f32> = first
            .iter()
            .map(|f| {
                f.trim()
                    .parse()
                    .map_err(|_| LoaderError::ParseError(format!("invalid value: {}", f)))
            })
            .collect::<Result<_>>()?;
        matrix.push(first_row);

        for result in records {
            let record = result?;
            let row: Vec<f32> = record
                .iter()
                .map(|f| {
                    f.trim()
                        .parse()
                        .map_err(|_| LoaderError::ParseError(format!("invalid value: {}", f)))
                })
                .collect::<Result<_>>()?;
            matrix.push(row);
        }

        let cloud = cloud_from_matrix(&matrix)?;
        if cloud.is_empty() {
            return Err(LoaderError::EmptyFile(path.to_path_buf()));
        }

        Ok(cloud)
    }
}

/// Load a point cloud from an ASCII PLY file.
///
/// Supports PLY files with vertex elements containing:
/// - Required: x, y, z properties
/// - Optional: red, green, blue color properties
///
/// # Errors
///
/// Returns an error if the file is not a valid PLY or lacks required properties.
pub fn load_ply<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    // Check PLY magic number
    let first_line = lines
        .next()
        .ok_or_else(|| LoaderError::InvalidPly("Empty file".to_string()))??;

    if !first_line.trim().starts_with("ply") {
        return Err(LoaderError::InvalidPly(format!(
            "{} is not a PLY file",
            path.display()
        )));
    }

    // Parse header
    let mut num_vertices: Option<usize> = None;
    let mut prop_names: Vec<String> = Vec::new();
    let mut header_done = false;

    for line in &mut lines {
        let line = line?;
        let stripped = line.trim();

        if stripped.starts_with("element vertex") {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            if let Some(count_str) = parts.last() {
                num_vertices = count_str.parse().ok();
            }
        } else if stripped.starts_with("property") {
            let parts: Vec<&str> = stripped.split_whitespace().collect();
            if let Some(name) = parts.last() {
                prop_names.push(name.to_string());
            }
        } else if stripped == "end_header" {
            header_done = true;
            break;
        }
    }

    let num_vertices = num_vertices
        .ok_or_else(|| LoaderError::InvalidPly("No vertex count in header".to_string()))?;

    if !header_done {
        return Err(LoaderError::InvalidPly("Missing end_header".to_string()));
    }

    // Build property index map
    let prop_idx: HashMap<&str, usize> = prop_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    // Verify required properties
    let x_idx = prop_idx
        .get("x")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("x".to_string()))?;
    let y_idx = prop_idx
        .get("y")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("y".to_string()))?;
    let z_idx = prop_idx
        .get("z")
        .copied()
        .ok_or_else(|| LoaderError::MissingColumns("z".to_string()))?;

    // Check for color properties
    let has_colors = prop_idx.contains_key("red")
        && prop_idx.contains_key("green")
        && prop_idx.contains_key("blue");

    let (r_idx, g_idx, b_idx) = if has_colors {
        (prop_idx["red"], prop_idx["green"], prop_idx["blue"])
    } else {
        (0, 0, 0)
    };

    // Pre-allocate vectors
    let mut x_vec = Vec::with_capacity(num_vertices);
    let mut y_vec = Vec::with_capacity(num_vertices);
    let mut z_vec = Vec::with_capacity(num_vertices);
    let mut colors_vec = if has_colors {
        Vec::with_capacity(num_vertices)
    } else {
        Vec::new()
    };

    // Parse vertex data
    let mut vertex_count = 0;
    for line in lines {
        if vertex_count >= num_vertices {
            break;
        }

        let line = line?;
        let values: Vec<&str> = line.split_whitespace().collect();

        if values.len() < prop_names.len() {
            continue;
        }

        let x: f32 = values[x_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid x value: {}", values[x_idx])))?;
        let y: f32 = values[y_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid y value: {}", values[y_idx])))?;
        let z: f32 = values[z_idx]
            .parse()
            .map_err(|_| LoaderError::ParseError(format!("Invalid z value: {}", values[z_idx])))?;

        x_vec.push(x);
        y_vec.push(y);
        z_vec.push(z);

        if has_colors {
            let r: u8 = values[r_idx].parse().unwrap_or(180);
            let g: u8 = values[g_idx].parse().unwrap_or(180);
            let b: u8 = values[b_idx].parse().unwrap_or(180);
            colors_vec.push([r, g, b]);
        }

        vertex_count += 1;
    }

    if vertex_count < num_vertices {
        return Err(LoaderError::InvalidPly(format!(
            "Expected {} vertices, found {}",
            num_vertices, vertex_count
        )));
    }

    let colors = if has_colors { Some(colors_vec) } else { None };

    Ok(PointCloud {
        x: x_vec,
        y: y_vec,
        z: z_vec,
        colors,
    })
}

/// Load a point cloud, dispatching on file extension.
///
/// `.ply` files go to [`load_ply`]; everything else is treated as CSV.
pub fn load_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let path = path.as_ref();

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("ply") => load_ply(path),
        Some(ext) if ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("txt") => {
            load_cartesian_csv(path)
        }
        _ => Err(LoaderError::UnsupportedExtension(path.to_path_buf())),
    }
}
