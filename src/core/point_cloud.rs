// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Velodyne point clouds in the KITTI binary format.
//!
//! A file is a flat sequence of little endian `f32`,
//! grouped by 4: forward, left, up, reflectance.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::{io_error, Error, Result};

/// Number of bytes of one point in the file.
pub const POINT_BYTES: usize = 16;

/// Velodyne points in homogeneous coordinates `[forward, left, up, 1.0]`.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PointCloud {
    points: Vec<[f32; 4]>,
}

impl PointCloud {
    /// Read a velodyne file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(io_error(path))?;
        Self::decode(&bytes, path)
    }

    /// Decode the content of a velodyne file.
    pub fn from_bytes(bytes: &[u8]) -> Result<PointCloud> {
        Self::decode(bytes, Path::new(""))
    }

    fn decode(bytes: &[u8], origin: &Path) -> Result<PointCloud> {
        if bytes.len() % POINT_BYTES != 0 {
            return Err(Error::MalformedInput {
                path: PathBuf::from(origin),
                len: bytes.len(),
            });
        }
        let mut buffer = vec![0.0; bytes.len() / 4];
        Cursor::new(bytes)
            .read_f32_into::<LittleEndian>(&mut buffer)
            .map_err(io_error(origin))?;
        // Reflectance is replaced by the homogeneous coordinate.
        let points = buffer
            .chunks_exact(4)
            .map(|p| [p[0], p[1], p[2], 1.0])
            .collect();
        Ok(PointCloud { points })
    }

    /// Build a point cloud from `[forward, left, up]` coordinates.
    pub fn from_xyz<I: IntoIterator<Item = [f32; 3]>>(xyz: I) -> PointCloud {
        PointCloud {
            points: xyz.into_iter().map(|[x, y, z]| [x, y, z, 1.0]).collect(),
        }
    }

    /// Drop points behind the sensor (forward coordinate < 0).
    ///
    /// This is only an approximation of what is visible by the camera.
    pub fn retain_forward(&mut self) {
        self.points.retain(|p| p[0] >= 0.0);
    }

    /// Homogeneous points.
    pub fn points(&self) -> &[[f32; 4]] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if there is no point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use byteorder::WriteBytesExt;

    fn encode(values: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 * values.len());
        for v in values {
            bytes.write_f32::<LittleEndian>(*v).unwrap();
        }
        bytes
    }

    #[test]
    fn rows_of_four() {
        let bytes = encode(&[1.0, 2.0, 3.0, 0.5, -4.0, 5.0, 6.0, 0.25]);
        let cloud = PointCloud::from_bytes(&bytes).unwrap();
        assert_eq!(
            &[[1.0, 2.0, 3.0, 1.0], [-4.0, 5.0, 6.0, 1.0]],
            cloud.points()
        );
    }

    #[test]
    fn empty_file() {
        assert!(PointCloud::from_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_file() {
        let bytes = encode(&[1.0, 2.0, 3.0]);
        match PointCloud::from_bytes(&bytes) {
            Err(Error::MalformedInput { len, .. }) => assert_eq!(12, len),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn retain_forward_keeps_zero() {
        let mut cloud =
            PointCloud::from_xyz(vec![[0.0, 1.0, 1.0], [-0.1, 1.0, 1.0], [3.0, 0.0, 0.0]]);
        cloud.retain_forward();
        assert_eq!(
            &[[0.0, 1.0, 1.0, 1.0], [3.0, 0.0, 0.0, 1.0]],
            cloud.points()
        );
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn homogeneous_coordinate_is_one(values: Vec<f32>) -> bool {
        let nb_values = values.len() - values.len() % 4;
        let bytes = encode(&values[..nb_values]);
        let cloud = PointCloud::from_bytes(&bytes).unwrap();
        cloud.len() == nb_values / 4 && cloud.points().iter().all(|p| p[3] == 1.0)
    }

    #[quickcheck_macros::quickcheck]
    fn nothing_behind_after_retain(values: Vec<f32>) -> bool {
        let nb_values = values.len() - values.len() % 4;
        let mut cloud = PointCloud::from_bytes(&encode(&values[..nb_values])).unwrap();
        cloud.retain_forward();
        cloud.points().iter().all(|p| p[0] >= 0.0)
    }
}
