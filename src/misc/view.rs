// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visualization of depth maps.

use image::GrayImage;

use crate::misc::interop;
use crate::misc::type_aliases::{DepthMap, Float};

// Create a gray image of a depth map.
// Inverse depth is linearly mapped to 1..=255, closest points being the brightest.
// Pixels without depth stay black.
pub fn depth_preview(depth_map: &DepthMap) -> GrayImage {
    let intensities = match idepth_min_max(depth_map) {
        Some((id_min, id_max)) => depth_map.map(|d| idepth_intensity(id_min, id_max, d)),
        None => depth_map.map(|_| 0),
    };
    interop::image_from_matrix(&intensities)
}

fn idepth_min_max(depth_map: &DepthMap) -> Option<(Float, Float)> {
    let mut min_temp: Option<Float> = None;
    let mut max_temp: Option<Float> = None;
    depth_map.iter().filter(|d| **d > 0.0).for_each(|d| {
        let idepth = 1.0 / d;
        min_temp = min_temp.map(|x| x.min(idepth)).or(Some(idepth));
        max_temp = max_temp.map(|x| x.max(idepth)).or(Some(idepth));
    });
    min_temp.zip(max_temp)
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn idepth_intensity(id_min: Float, id_max: Float, depth: Float) -> u8 {
    if depth <= 0.0 {
        0
    } else if id_max <= id_min {
        255
    } else {
        let ratio = (1.0 / depth - id_min) / (id_max - id_min);
        (1.0 + 254.0 * ratio).round() as u8
    }
}

// TESTS #############################################################
