// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Projection of velodyne points into the rectified image plane of a camera.

use nalgebra::RowVector4;

use crate::core::calibration::Calibration;
use crate::error::Result;
use crate::misc::type_aliases::{Mat3x4, Mat4};

/// Key of the rectifying rotation of the reference camera.
pub const RECTIFICATION_KEY: &str = "R_rect_00";

/// Key of the rectified projection matrix of a camera.
pub fn projection_key(camera: usize) -> String {
    format!("P_rect_0{}", camera)
}

/// Key of the rectified image size of a camera.
pub fn image_size_key(camera: usize) -> String {
    format!("S_rect_0{}", camera)
}

/// Rigid transformation from velodyne to camera coordinates.
///
/// `[R | T]` with the homogeneous row `[0, 0, 0, 1]` appended.
pub fn velo_to_cam(velo_to_cam: &Calibration) -> Result<Mat4> {
    let rotation = velo_to_cam.matrix3("R")?;
    let translation = velo_to_cam.vector3("T")?;
    let mut transform = Mat4::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    transform.set_row(3, &RowVector4::new(0.0, 0.0, 0.0, 1.0));
    Ok(transform)
}

/// Rectifying rotation of the reference camera, padded to 4x4.
pub fn cam_to_rect(cam_to_cam: &Calibration) -> Result<Mat4> {
    let mut rect = Mat4::identity();
    rect.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&cam_to_cam.matrix3(RECTIFICATION_KEY)?);
    Ok(rect)
}

/// Projection from velodyne coordinates to the image of one camera.
#[derive(Clone, PartialEq, Debug)]
pub struct Projection {
    /// `P_rect * R_cam2rect * velo_to_cam`.
    pub matrix: Mat3x4,
    /// Image shape `(height, width)`.
    pub shape: (usize, usize),
}

impl Projection {
    /// Build the projection of a given camera from both calibration files.
    pub fn from_calibration(
        cam_to_cam: &Calibration,
        velo_to_cam_calib: &Calibration,
        camera: usize,
    ) -> Result<Projection> {
        let velo_to_cam = velo_to_cam(velo_to_cam_calib)?;
        let shape = cam_to_cam.image_shape(&image_size_key(camera))?;
        let rect = cam_to_rect(cam_to_cam)?;
        let p_rect = cam_to_cam.matrix3x4(&projection_key(camera))?;
        Ok(Projection {
            matrix: p_rect * rect * velo_to_cam,
            shape,
        })
    }

    /// Image height.
    pub fn height(&self) -> usize {
        self.shape.0
    }

    /// Image width.
    pub fn width(&self) -> usize {
        self.shape.1
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::Error;

    const VELO_TO_CAM: &str = "calib_time: 15-Mar-2012 11:37:16
R: 7.533745e-03 -9.999714e-01 -6.166020e-04 1.480249e-02 7.280733e-04 -9.998902e-01 9.998621e-01 7.523790e-03 1.480755e-02
T: -4.069766e-03 -7.631618e-02 -2.717806e-01
delta_f: 0.000000e+00 0.000000e+00
";

    #[test]
    fn velo_to_cam_layout() {
        let calib = Calibration::parse(VELO_TO_CAM).unwrap();
        let transform = velo_to_cam(&calib).unwrap();
        assert_eq!(-9.999714e-01, transform[(0, 1)]);
        assert_eq!(9.998621e-01, transform[(2, 0)]);
        assert_eq!(-7.631618e-02, transform[(1, 3)]);
        assert_eq!(RowVector4::new(0.0, 0.0, 0.0, 1.0), transform.row(3));
    }

    #[test]
    fn missing_translation() {
        let calib = Calibration::parse("R: 1 0 0 0 1 0 0 0 1").unwrap();
        assert!(matches!(velo_to_cam(&calib), Err(Error::MissingField { .. })));
    }

    #[test]
    fn projection_order() {
        // A pure translation in velodyne->cam, a rotation in rectification,
        // and a scaling in the projection: the product order is visible.
        let cam_to_cam = Calibration::parse(
            "R_rect_00: 0 -1 0 1 0 0 0 0 1
P_rect_01: 2 0 0 0 0 3 0 0 0 0 1 0
S_rect_01: 10 20",
        )
        .unwrap();
        let velo = Calibration::parse("R: 1 0 0 0 1 0 0 0 1\nT: 1 2 3").unwrap();
        let projection = Projection::from_calibration(&cam_to_cam, &velo, 1).unwrap();
        assert_eq!((20, 10), projection.shape);
        let expected = Mat3x4::new(
            0.0, -2.0, 0.0, -4.0, //
            3.0, 0.0, 0.0, 3.0, //
            0.0, 0.0, 1.0, 3.0,
        );
        approx::assert_relative_eq!(expected, projection.matrix);
    }

    #[test]
    fn unknown_camera() {
        let cam_to_cam = Calibration::parse(
            "R_rect_00: 1 0 0 0 1 0 0 0 1
P_rect_02: 1 0 0 0 0 1 0 0 0 0 1 0
S_rect_02: 4 4",
        )
        .unwrap();
        let velo = Calibration::parse("R: 1 0 0 0 1 0 0 0 1\nT: 0 0 0").unwrap();
        let result = Projection::from_calibration(&cam_to_cam, &velo, 3);
        match result {
            Err(Error::MissingField { key }) => assert_eq!("S_rect_03", key),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn velo_to_cam_bottom_row(values: Vec<f64>) -> bool {
        if values.len() < 12 || values.iter().take(12).any(|x| !x.is_finite()) {
            return true;
        }
        let r: Vec<String> = values[..9].iter().map(|x| format!("{:e}", x)).collect();
        let t: Vec<String> = values[9..12].iter().map(|x| format!("{:e}", x)).collect();
        let content = format!("R: {}\nT: {}", r.join(" "), t.join(" "));
        let transform = velo_to_cam(&Calibration::parse(&content).unwrap()).unwrap();
        transform.row(3) == RowVector4::new(0.0, 0.0, 0.0, 1.0)
    }
}
