// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Archive of depth maps, one per frame of a split.
//!
//! Depth maps do not all have the same shape, so they are stored
//! as a gzip compressed tar of `.npy` files named after the frame index:
//! `000000.npy`, `000001.npy`, ...

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{io_error, Error, Result};
use crate::misc::npy;

/// Name of the archive entry of a given frame.
pub fn entry_name(index: usize) -> String {
    format!("{:06}.npy", index)
}

/// Write all depth maps in a `.tar.gz` archive.
pub fn write<P: AsRef<Path>>(path: P, depth_maps: &[DMatrix<f32>]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(io_error(path))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (index, depth_map) in depth_maps.iter().enumerate() {
        let data = npy::to_bytes(depth_map).map_err(io_error(path))?;
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, entry_name(index), data.as_slice())
            .map_err(io_error(path))?;
    }
    let encoder = builder.into_inner().map_err(io_error(path))?;
    let mut writer = encoder.finish().map_err(io_error(path))?;
    writer.flush().map_err(io_error(path))?;
    tracing::debug!(path = %path.display(), frames = depth_maps.len(), "archive written");
    Ok(())
}

/// Read all depth maps of an archive, ordered by frame index.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<DMatrix<f32>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_error(path))?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    // Create a map with the content, keyed by frame index.
    let mut data = BTreeMap::new();
    for entry in archive.entries().map_err(io_error(path))? {
        // Check for an I/O error.
        let mut entry = entry.map_err(io_error(path))?;

        let entry_path = entry.path().map_err(io_error(path))?.into_owned();
        let index = entry_path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::Archive(format!("unexpected entry {:?}", entry_path)))?;
        let mut buffer = Vec::new();
        entry.read_to_end(&mut buffer).map_err(io_error(path))?;
        data.insert(index, npy::read(&buffer)?);
    }

    // Indices must be exactly 0..n.
    if let Some((last, _)) = data.iter().next_back() {
        if *last + 1 != data.len() {
            return Err(Error::Archive(format!(
                "{} entries but last index is {}",
                data.len(),
                last
            )));
        }
    }
    Ok(data.into_values().collect())
}

// TESTS #############################################################
