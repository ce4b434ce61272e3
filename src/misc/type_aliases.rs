// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Type aliases for common types used all over the code base.

use nalgebra as na;

/// Projection math is done in f64, like the reference ground truth.
pub type Float = f64;

/// A vector with three Float coordinates.
pub type Vec3 = na::Vector3<Float>;
/// A vector with four Float coordinates (homogeneous 3D point).
pub type Vec4 = na::Vector4<Float>;

/// A 3x3 matrix of Floats.
pub type Mat3 = na::Matrix3<Float>;
/// A 3x4 matrix of Floats.
pub type Mat3x4 = na::Matrix3x4<Float>;
/// A 4x4 matrix of Floats.
pub type Mat4 = na::Matrix4<Float>;

/// Dense depth map, indexed by `(row, column)` i.e. `(v, u)`.
pub type DepthMap = na::DMatrix<Float>;
