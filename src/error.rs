// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types shared by the whole crate.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort the generation of a depth map or of an archive.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unreadable input file, or failed write.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Point cloud byte length is not a multiple of 16.
    #[error("malformed point cloud {path:?}: {len} bytes is not a multiple of 16")]
    MalformedInput { path: PathBuf, len: usize },

    /// Calibration line without a `key: value` structure.
    #[error("malformed calibration line in {path:?}: {line:?}")]
    CalibrationLine { path: PathBuf, line: String },

    /// Calibration key absent, or present but not numeric.
    #[error("missing numeric calibration field: {key}")]
    MissingField { key: String },

    /// Numeric calibration field with an unexpected number of values.
    #[error("calibration field {key} has {found} values, expected {expected}")]
    FieldLength {
        key: String,
        expected: usize,
        found: usize,
    },

    /// Unparsable line in a split file.
    #[error("unparsable split line {line_number}: {line:?}")]
    SplitLine { line_number: usize, line: String },

    /// Unexpected content in a depth maps archive.
    #[error("invalid archive content: {0}")]
    Archive(String),

    #[error("png decoding error: {0}")]
    PngDecoding(#[from] png::DecodingError),

    #[error("png encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to an I/O error.
pub(crate) fn io_error<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> Error {
    let path = path.into();
    move |source| Error::Io { path, source }
}
