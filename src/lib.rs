// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ground truth depth maps for the KITTI dataset.
//!
//! Velodyne point clouds are projected into the rectified image of a camera,
//! using the calibration files of the recording day.
//! The resulting sparse depth maps are the ground truth used
//! to evaluate monocular depth estimation networks.

pub mod core;
pub mod dataset;
pub mod error;
pub mod misc;
