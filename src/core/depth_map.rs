// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generation of ground truth depth maps from velodyne point clouds.
//!
//! Points are projected in the rectified image of a camera,
//! quantized to pixels, and the closest point is kept when
//! several of them fall into the same pixel.

use std::collections::HashMap;
use std::path::Path;

use crate::core::calibration::Calibration;
use crate::core::point_cloud::PointCloud;
use crate::core::projection::Projection;
use crate::error::Result;
use crate::misc::type_aliases::{DepthMap, Float, Vec4};

/// Name of the camera to camera calibration file in a calibration directory.
pub const CAM_TO_CAM_FILE: &str = "calib_cam_to_cam.txt";

/// Name of the velodyne to camera calibration file in a calibration directory.
pub const VELO_TO_CAM_FILE: &str = "calib_velo_to_cam.txt";

/// A velodyne point quantized to a pixel of the image.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ProjectedPoint {
    /// Column.
    pub u: usize,
    /// Row.
    pub v: usize,
    /// Depth of the point.
    pub depth: Float,
}

/// Generate the depth map of one velodyne frame, seen from a given camera.
///
/// `calibration_dir` must contain `calib_cam_to_cam.txt` and `calib_velo_to_cam.txt`.
/// With `use_velodyne_depth`, depth is the forward distance of the velodyne point
/// instead of the projective depth in the camera.
pub fn generate_depth_map<P, Q>(
    calibration_dir: P,
    velodyne_file: Q,
    camera: usize,
    use_velodyne_depth: bool,
) -> Result<DepthMap>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let calibration_dir = calibration_dir.as_ref();
    let cam_to_cam = Calibration::from_file(calibration_dir.join(CAM_TO_CAM_FILE))?;
    let velo_to_cam = Calibration::from_file(calibration_dir.join(VELO_TO_CAM_FILE))?;
    let projection = Projection::from_calibration(&cam_to_cam, &velo_to_cam, camera)?;
    let mut cloud = PointCloud::from_file(velodyne_file)?;
    cloud.retain_forward();
    Ok(depth_map_from_points(&projection, &cloud, use_velodyne_depth))
}

/// Depth map of already loaded points.
///
/// Points behind the sensor are expected to have been removed already.
pub fn depth_map_from_points(
    projection: &Projection,
    cloud: &PointCloud,
    use_velodyne_depth: bool,
) -> DepthMap {
    let points = project_points(projection, cloud, use_velodyne_depth);
    let mut depth_map = scatter(projection.shape, &points);
    resolve_duplicates(&mut depth_map, &points);
    depth_map.apply(|d| {
        if *d < 0.0 {
            *d = 0.0
        }
    });
    depth_map
}

/// Project every point and keep those falling inside the image.
pub fn project_points(
    projection: &Projection,
    cloud: &PointCloud,
    use_velodyne_depth: bool,
) -> Vec<ProjectedPoint> {
    let (height, width) = projection.shape;
    cloud
        .points()
        .iter()
        .filter_map(|p| {
            let homogeneous = Vec4::new(
                Float::from(p[0]),
                Float::from(p[1]),
                Float::from(p[2]),
                Float::from(p[3]),
            );
            let projected = projection.matrix * homogeneous;
            let z = projected.z;
            let depth = if use_velodyne_depth {
                Float::from(p[0])
            } else {
                z
            };
            let u = pixel_coordinate(projected.x / z);
            let v = pixel_coordinate(projected.y / z);
            in_image(u, v, width, height).map(|(u, v)| ProjectedPoint { u, v, depth })
        })
        .collect()
}

/// Round to the nearest integer (ties to even) and remove 1.
///
/// The offset gives exactly the same pixels as the KITTI devkit (Matlab) code.
fn pixel_coordinate(x: Float) -> Float {
    x.round_ties_even() - 1.0
}

/// Check that `u` and `v` are valid column and row indices.
/// NaN and infinite coordinates are never inside.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn in_image(u: Float, v: Float, width: usize, height: usize) -> Option<(usize, usize)> {
    if u >= 0.0 && v >= 0.0 && u < width as Float && v < height as Float {
        Some((u as usize, v as usize))
    } else {
        None
    }
}

/// Write every point depth at its pixel in a zero initialized map.
/// When several points share a pixel, the last one is written.
pub fn scatter(shape: (usize, usize), points: &[ProjectedPoint]) -> DepthMap {
    let (height, width) = shape;
    let mut depth_map = DepthMap::zeros(height, width);
    for p in points {
        depth_map[(p.v, p.u)] = p.depth;
    }
    depth_map
}

/// Keep the closest depth in every pixel hit by more than one point.
pub fn resolve_duplicates(depth_map: &mut DepthMap, points: &[ProjectedPoint]) {
    let width = depth_map.ncols();
    let mut candidates: HashMap<usize, Vec<Float>> = HashMap::new();
    for p in points {
        candidates
            .entry(p.v * width + p.u)
            .or_default()
            .push(p.depth);
    }
    for (index, depths) in candidates.iter().filter(|(_, d)| d.len() > 1) {
        let closest = depths.iter().cloned().fold(Float::INFINITY, Float::min);
        depth_map[(index / width, index % width)] = closest;
    }
}

// TESTS #############################################################
