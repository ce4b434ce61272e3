// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading of KITTI calibration files.
//!
//! Both `calib_cam_to_cam.txt` and `calib_velo_to_cam.txt` are made of
//! `key: value` lines. Values are vectors of numbers most of the time,
//! but some are plain text (like `calib_time: 09-Jan-2012 13:57:47`).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{io_error, Error, Result};
use crate::misc::type_aliases::{Float, Mat3, Mat3x4, Vec3};

/// Characters allowed in a value for it to be considered numeric.
const FLOAT_CHARS: &str = "0123456789.e+- ";

/// Value of a calibration entry.
#[derive(Clone, PartialEq, Debug)]
pub enum CalibValue {
    /// Every token of the value parsed as a number.
    Numeric(Vec<Float>),
    /// Value kept as is when it is not entirely numeric.
    Raw(String),
}

impl CalibValue {
    /// Parse a trimmed value, falling back to the raw string on any failure.
    pub fn parse(value: &str) -> CalibValue {
        if value.is_empty() || !value.chars().all(|c| FLOAT_CHARS.contains(c)) {
            return CalibValue::Raw(value.to_string());
        }
        let numbers: std::result::Result<Vec<Float>, _> =
            value.split_whitespace().map(str::parse).collect();
        match numbers {
            Ok(numbers) => CalibValue::Numeric(numbers),
            Err(_) => CalibValue::Raw(value.to_string()),
        }
    }

    /// Numbers of the value if it is numeric.
    pub fn as_numeric(&self) -> Option<&[Float]> {
        match self {
            CalibValue::Numeric(numbers) => Some(numbers),
            CalibValue::Raw(_) => None,
        }
    }
}

/// Content of one calibration file.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Calibration {
    entries: HashMap<String, CalibValue>,
}

impl Calibration {
    /// Read and parse a calibration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Calibration> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(io_error(path))?;
        Self::parse_with_origin(&content, path)
    }

    /// Parse the content of a calibration file.
    pub fn parse(content: &str) -> Result<Calibration> {
        Self::parse_with_origin(content, Path::new(""))
    }

    fn parse_with_origin(content: &str, origin: &Path) -> Result<Calibration> {
        let mut entries = HashMap::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line.split_once(':').ok_or_else(|| Error::CalibrationLine {
                path: PathBuf::from(origin),
                line: line.to_string(),
            })?;
            entries.insert(key.trim().to_string(), CalibValue::parse(value.trim()));
        }
        Ok(Calibration { entries })
    }

    /// Raw access to an entry.
    pub fn get(&self, key: &str) -> Option<&CalibValue> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the file had no entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numbers of a required numeric entry.
    pub fn numeric(&self, key: &str) -> Result<&[Float]> {
        self.get(key)
            .and_then(CalibValue::as_numeric)
            .ok_or_else(|| Error::MissingField {
                key: key.to_string(),
            })
    }

    /// Numbers of a required numeric entry having exactly `expected` values.
    pub fn numeric_exact(&self, key: &str, expected: usize) -> Result<&[Float]> {
        let numbers = self.numeric(key)?;
        if numbers.len() == expected {
            Ok(numbers)
        } else {
            Err(Error::FieldLength {
                key: key.to_string(),
                expected,
                found: numbers.len(),
            })
        }
    }

    /// 3x3 matrix stored in row major order.
    pub fn matrix3(&self, key: &str) -> Result<Mat3> {
        Ok(Mat3::from_row_slice(self.numeric_exact(key, 9)?))
    }

    /// 3x4 matrix stored in row major order.
    pub fn matrix3x4(&self, key: &str) -> Result<Mat3x4> {
        Ok(Mat3x4::from_row_slice(self.numeric_exact(key, 12)?))
    }

    /// 3D vector.
    pub fn vector3(&self, key: &str) -> Result<Vec3> {
        Ok(Vec3::from_row_slice(self.numeric_exact(key, 3)?))
    }

    /// Image size stored as `width height`, returned as `(height, width)`.
    ///
    /// Values are truncated towards zero.
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    pub fn image_shape(&self, key: &str) -> Result<(usize, usize)> {
        let size = self.numeric_exact(key, 2)?;
        if size.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(Error::MissingField {
                key: key.to_string(),
            });
        }
        Ok((size[1] as usize, size[0] as usize))
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    const CAM_TO_CAM: &str = "calib_time: 09-Jan-2012 13:57:47
corner_dist: 9.950000e-02
S_rect_02: 1.242000e+03 3.750000e+02
R_rect_00: 9.999239e-01 9.837760e-03 -7.445048e-03 -9.869795e-03 9.999421e-01 -4.278459e-03 7.402527e-03 4.351614e-03 9.999631e-01
P_rect_02: 7.215377e+02 0.000000e+00 6.095593e+02 4.485728e+01 0.000000e+00 7.215377e+02 1.728540e+02 2.163791e-01 0.000000e+00 0.000000e+00 1.000000e+00 2.745884e-03
";

    #[test]
    fn text_values_are_kept_raw() {
        let calib = Calibration::parse(CAM_TO_CAM).unwrap();
        assert_eq!(
            Some(&CalibValue::Raw("09-Jan-2012 13:57:47".to_string())),
            calib.get("calib_time")
        );
    }

    #[test]
    fn numeric_values_are_parsed() {
        let calib = Calibration::parse(CAM_TO_CAM).unwrap();
        assert_eq!(5, calib.len());
        assert_eq!(&[0.0995], calib.numeric("corner_dist").unwrap());
        assert_eq!((375, 1242), calib.image_shape("S_rect_02").unwrap());
        let p = calib.matrix3x4("P_rect_02").unwrap();
        assert_eq!(6.095593e+02, p[(0, 2)]);
        assert_eq!(2.745884e-03, p[(2, 3)]);
    }

    #[test]
    fn only_float_chars_but_not_a_number() {
        assert_eq!(CalibValue::Raw("1.2.3 e".to_string()), CalibValue::parse("1.2.3 e"));
        assert_eq!(CalibValue::Raw("+-".to_string()), CalibValue::parse("+-"));
    }

    #[test]
    fn empty_value_is_raw() {
        let calib = Calibration::parse("empty:\n").unwrap();
        assert_eq!(Some(&CalibValue::Raw(String::new())), calib.get("empty"));
    }

    #[test]
    fn value_split_on_first_colon() {
        let calib = Calibration::parse("time: 13:57:47").unwrap();
        assert_eq!(Some(&CalibValue::Raw("13:57:47".to_string())), calib.get("time"));
    }

    #[test]
    fn line_without_colon_is_an_error() {
        match Calibration::parse("R 1 0 0") {
            Err(Error::CalibrationLine { line, .. }) => assert_eq!("R 1 0 0", line),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_and_raw_fields() {
        let calib = Calibration::parse(CAM_TO_CAM).unwrap();
        assert!(matches!(calib.matrix3("R"), Err(Error::MissingField { .. })));
        assert!(matches!(
            calib.numeric("calib_time"),
            Err(Error::MissingField { .. })
        ));
    }

    #[test]
    fn wrong_length() {
        let calib = Calibration::parse(CAM_TO_CAM).unwrap();
        match calib.matrix3("S_rect_02") {
            Err(Error::FieldLength {
                expected, found, ..
            }) => assert_eq!((9, 2), (expected, found)),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_file() {
        let result = Calibration::from_file("this/file/does/not/exist.txt");
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn finite_numbers_are_parsed_back(values: Vec<f64>) -> bool {
        let values: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
        if values.is_empty() {
            return true;
        }
        let line: Vec<String> = values.iter().map(|x| format!("{:e}", x)).collect();
        CalibValue::parse(&line.join(" ")) == CalibValue::Numeric(values)
    }
}
