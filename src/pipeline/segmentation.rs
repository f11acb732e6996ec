//! Height-band segmentation.
//!
//! Isolates the candidate object points by their vertical coordinate before
//! the (much more expensive) clustering stage runs. The band is an open
//! interval so that points lying exactly on a reference plane or at a sensor
//! saturation value are never picked up.

use crate::core::cloud::{PointCloud, SelectionMask};

/// Filter a cloud to the points whose z coordinate lies strictly inside
/// `(z_min, z_max)`.
///
/// Returns the filtered cloud together with a selection mask aligned with
/// the input: applying the mask to `cloud` reproduces the returned cloud
/// index-for-index. An empty or inverted band selects nothing; this is not
/// an error here, the caller decides whether an empty result is fatal.
pub fn segment_height_band(
    cloud: &PointCloud,
    z_min: f32,
    z_max: f32,
) -> (PointCloud, SelectionMask) {
    let mask: SelectionMask = cloud.z.iter().map(|&z| z_min < z && z < z_max).collect();

    let band = cloud.filter_by_mask(&mask);

    (band, mask)
}
