// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::{GrayImage, Luma};
use nalgebra::DMatrix;

/// Convert an `u8` matrix into a `GrayImage`.
///
/// Performs a transposition to accomodate for the
/// column major matrix into the row major image.
#[allow(clippy::cast_possible_truncation)]
pub fn image_from_matrix(mat: &DMatrix<u8>) -> GrayImage {
    let (nb_rows, nb_cols) = mat.shape();
    let mut img_buf = GrayImage::new(nb_cols as u32, nb_rows as u32);
    for (x, y, pixel) in img_buf.enumerate_pixels_mut() {
        *pixel = Luma([mat[(y as usize, x as usize)]]);
    }
    img_buf
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn not_square() {
        let mat = DMatrix::from_row_slice(2, 3, &[1, 2, 3, 4, 5, 6]);
        let img = image_from_matrix(&mat);
        assert_eq!((3, 2), img.dimensions());
        assert_eq!(&Luma([3]), img.get_pixel(2, 0));
        assert_eq!(&Luma([4]), img.get_pixel(0, 1));
        assert_eq!(vec![1, 2, 3, 4, 5, 6], img.into_raw());
    }
}
