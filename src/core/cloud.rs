//! Point cloud data model.
//!
//! Coordinates are Cartesian, in meters, stored struct-of-arrays. Clouds are
//! never mutated in place by the pipeline: every filtering stage produces a
//! new cloud, optionally together with a [`SelectionMask`] aligned with the
//! input ordering.

/// Boolean selection mask aligned with a reference point cloud.
///
/// `true` means "retained". The mask length always equals the reference
/// cloud's length, and applying the mask to the reference reproduces the
/// filtered cloud index-for-index. A mask must never be reused against a
/// cloud it was not computed from.
pub type SelectionMask = Vec<bool>;

/// Container for 3D point cloud data.
#[derive(Debug, Clone)]
pub struct PointCloud {
    /// X coordinates of all points.
    pub x: Vec<f32>,
    /// Y coordinates of all points.
    pub y: Vec<f32>,
    /// Z (vertical) coordinates of all points.
    pub z: Vec<f32>,
    /// Optional RGB colors for each point.
    pub colors: Option<Vec<[u8; 3]>>,
}

impl PointCloud {
    /// Creates a new empty point cloud.
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            colors: None,
        }
    }

    /// Creates a new point cloud from coordinate vectors.
    pub fn from_xyz(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        Self {
            x,
            y,
            z,
            colors: None,
        }
    }

    /// Creates a new point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            z: Vec::with_capacity(capacity),
            colors: None,
        }
    }

    /// Returns the number of points in the cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Returns true if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Converts the cloud to a vector of `[x, y, z]` coordinate arrays.
    pub fn to_coords(&self) -> Vec<[f32; 3]> {
        let n = self.len();
        let mut coords = Vec::with_capacity(n);
        for i in 0..n {
            coords.push([self.x[i], self.y[i], self.z[i]]);
        }
        coords
    }

    /// Adds a point to the cloud.
    #[inline]
    pub fn push(&mut self, x: f32, y: f32, z: f32) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    /// Adds a point with color to the cloud.
    pub fn push_with_color(&mut self, x: f32, y: f32, z: f32, color: [u8; 3]) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);

        if self.colors.is_none() {
            self.colors = Some(Vec::with_capacity(self.x.capacity()));
        }
        if let Some(ref mut colors) = self.colors {
            colors.push(color);
        }
    }

    /// Returns a new cloud containing the points at the given indices, in order.
    ///
    /// Indices must be in range; colors are carried through when present.
    pub fn select(&self, indices: &[usize]) -> PointCloud {
        let mut x = Vec::with_capacity(indices.len());
        let mut y = Vec::with_capacity(indices.len());
        let mut z = Vec::with_capacity(indices.len());

        for &i in indices {
            x.push(self.x[i]);
            y.push(self.y[i]);
            z.push(self.z[i]);
        }

        let colors = self
            .colors
            .as_ref()
            .map(|c| indices.iter().map(|&i| c[i]).collect());

        PointCloud { x, y, z, colors }
    }

    /// Returns a new cloud containing the points where `mask` is `true`.
    ///
    /// The mask length must equal the cloud length; ordering is preserved.
    pub fn filter_by_mask(&self, mask: &SelectionMask) -> PointCloud {
        debug_assert_eq!(mask.len(), self.len(), "mask must align with cloud");

        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| if keep { Some(i) } else { None })
            .collect();

        self.select(&indices)
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned bounding box over a set of 3D points.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
    empty: bool,
}

impl Aabb {
    /// Creates an empty box that contains no points.
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
            empty: true,
        }
    }

    /// Returns true if no finite point has been added.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Grows the box to contain `point`. Non-finite points are ignored.
    pub fn expand_with_point(&mut self, point: [f32; 3]) {
        if !point.iter().all(|v| v.is_finite()) {
            return;
        }

        if self.empty {
            self.min = point;
            self.max = point;
            self.empty = false;
            return;
        }

        for (axis, &val) in point.iter().enumerate() {
            self.min[axis] = self.min[axis].min(val);
            self.max[axis] = self.max[axis].max(val);
        }
    }

    /// Computes the bounding box of a point cloud.
    pub fn from_cloud(cloud: &PointCloud) -> Self {
        let mut aabb = Self::empty();
        for i in 0..cloud.len() {
            aabb.expand_with_point([cloud.x[i], cloud.y[i], cloud.z[i]]);
        }
        aabb
    }

    /// Returns the extent (max - min) along the given axis, 0 when empty.
    pub fn extent(&self, axis: usize) -> f32 {
        if self.empty {
            0.0
        } else {
            self.max[axis] - self.min[axis]
        }
    }
}
