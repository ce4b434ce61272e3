// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::DMatrix;
use std::{
    fs::File,
    io::{BufWriter, Cursor},
    path::Path,
};

use crate::error::{io_error, Result};
use crate::misc::type_aliases::{DepthMap, Float};

/// Depth values are scaled for better precision in 16 bits depth png.
/// So 256 in the 16 bits gray png corresponds to 1 meter (KITTI devkit convention).
pub const DEPTH_SCALE: Float = 256.0;

/// Read a 16 bit gray png image from a file.
pub fn read_png_16bits<P: AsRef<Path>>(file_path: P) -> Result<(usize, usize, Vec<u16>)> {
    let file_path = file_path.as_ref();
    let img_file = File::open(file_path).map_err(io_error(file_path))?;
    let mut decoder = png::Decoder::new(img_file);
    // Use the IDENTITY transformation because otherwise
    // 16 bits might be stripped down to 8 bits.
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer)?;

    // Transform buffer into 16 bits slice.
    let mut buffer_u16 = vec![0; (info.width * info.height) as usize];
    let mut buffer_cursor = Cursor::new(buffer);
    buffer_cursor
        .read_u16_into::<BigEndian>(&mut buffer_u16)
        .map_err(io_error(file_path))?;

    Ok((info.width as usize, info.height as usize, buffer_u16))
}

/// Write a 16 bit gray png image, given in row major order.
#[allow(clippy::cast_possible_truncation)]
pub fn write_png_16bits<P: AsRef<Path>>(
    file_path: P,
    width: usize,
    height: usize,
    buffer_u16: &[u16],
) -> Result<()> {
    let file_path = file_path.as_ref();
    let img_file = File::create(file_path).map_err(io_error(file_path))?;
    let mut encoder = png::Encoder::new(BufWriter::new(img_file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut writer = encoder.write_header()?;

    // Png stores 16 bits samples in big endian.
    let mut buffer = Vec::with_capacity(2 * buffer_u16.len());
    for x in buffer_u16 {
        buffer
            .write_u16::<BigEndian>(*x)
            .map_err(io_error(file_path))?;
    }
    writer.write_image_data(&buffer)?;
    writer.finish()?;
    Ok(())
}

/// Save a depth map as a 16 bits png, scaled by `DEPTH_SCALE`.
///
/// Depths are rounded and saturated to the u16 range, 0 meaning no depth.
pub fn write_depth_png<P: AsRef<Path>>(file_path: P, depth_map: &DepthMap) -> Result<()> {
    let (height, width) = depth_map.shape();
    let buffer: Vec<u16> = depth_map.transpose().iter().map(|d| to_u16(*d)).collect();
    write_png_16bits(file_path, width, height, &buffer)
}

/// Read a depth map saved with `write_depth_png`.
pub fn read_depth_png<P: AsRef<Path>>(file_path: P) -> Result<DepthMap> {
    let (width, height, buffer) = read_png_16bits(file_path)?;
    let depth_u16 = DMatrix::from_row_slice(height, width, buffer.as_slice());
    Ok(depth_u16.map(|d| Float::from(d) / DEPTH_SCALE))
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn to_u16(depth: Float) -> u16 {
    // Float to int casts saturate, and NaN becomes 0.
    (depth * DEPTH_SCALE).round() as u16
}

// TESTS #############################################################
