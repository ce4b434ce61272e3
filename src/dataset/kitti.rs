// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to handle the KITTI raw dataset
//! and generate the ground truth depth maps of a split.
//!
//! Expected layout of the dataset:
//!
//! ```text
//! <root>/<date>/calib_cam_to_cam.txt
//! <root>/<date>/calib_velo_to_cam.txt
//! <root>/<date>/<drive>/velodyne_points/data/0000000069.bin
//! ```

use indicatif::ProgressBar;
use nalgebra::DMatrix;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::depth_map::generate_depth_map;
use crate::dataset::archive;
use crate::error::{io_error, Result};

/// One frame of a split file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FrameDescriptor {
    /// Recording date, also the directory holding the calibration files.
    pub date: String,
    /// Drive directory, like `2011_09_26_drive_0002_sync`.
    pub drive: String,
    /// Index of the frame in the drive.
    pub frame_index: usize,
}

impl FrameDescriptor {
    /// Directory containing the calibration files of this frame.
    pub fn calibration_dir<P: AsRef<Path>>(&self, root: P) -> PathBuf {
        root.as_ref().join(&self.date)
    }

    /// Velodyne file of this frame.
    pub fn velodyne_file<P: AsRef<Path>>(&self, root: P) -> PathBuf {
        root.as_ref()
            .join(&self.date)
            .join(&self.drive)
            .join("velodyne_points")
            .join("data")
            .join(format!("{:010}.bin", self.frame_index))
    }
}

/// Configuration of the ground truth generation.
#[derive(Clone, Debug)]
pub struct Config {
    /// Camera whose rectified image the depth maps are aligned with.
    pub camera: usize,
    /// Use the velodyne forward distance as depth instead of the projective depth.
    pub use_velodyne_depth: bool,
    /// Name of the split file, in the split directory.
    pub split_file: String,
    /// Name of the generated archive, in the split directory.
    pub archive_file: String,
    /// Keep going when a frame fails, storing an empty depth map for it.
    pub skip_failed: bool,
    /// Display a progress bar.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            camera: 2,
            use_velodyne_depth: true,
            split_file: "test_files.txt".to_string(),
            archive_file: "depths.tar.gz".to_string(),
            skip_failed: false,
            progress: true,
        }
    }
}

/// Outcome of a ground truth generation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Summary {
    /// Number of frames in the split, so also in the archive.
    pub frames: usize,
    /// Number of frames that failed and were stored empty.
    pub skipped: usize,
}

/// Generate the depth maps of every frame listed in a split file,
/// and store them in an archive in the split directory.
pub fn generate_ground_truth<P, Q>(kitti_root: P, split_dir: Q, config: &Config) -> Result<Summary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (kitti_root, split_dir) = (kitti_root.as_ref(), split_dir.as_ref());
    let split_path = split_dir.join(&config.split_file);
    let content = fs::read_to_string(&split_path).map_err(io_error(&split_path))?;
    let frames = parse::split(&content)?;
    info!(
        split = %split_path.display(),
        frames = frames.len(),
        camera = config.camera,
        "generating ground truth"
    );

    let (depth_maps, skipped) = generate_depth_maps(kitti_root, &frames, config)?;
    let archive_path = split_dir.join(&config.archive_file);
    archive::write(&archive_path, &depth_maps)?;
    info!(archive = %archive_path.display(), skipped, "ground truth written");
    Ok(Summary {
        frames: frames.len(),
        skipped,
    })
}

/// Generate the `f32` depth maps of the given frames, in the same order.
///
/// Also returns the number of skipped frames (always 0 without `skip_failed`).
#[allow(clippy::cast_possible_truncation)]
pub fn generate_depth_maps<P: AsRef<Path>>(
    kitti_root: P,
    frames: &[FrameDescriptor],
    config: &Config,
) -> Result<(Vec<DMatrix<f32>>, usize)> {
    let kitti_root = kitti_root.as_ref();
    let bar = if config.progress {
        ProgressBar::new(frames.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    let mut depth_maps = Vec::with_capacity(frames.len());
    let mut skipped = 0;
    for (index, frame) in frames.iter().enumerate() {
        let calibration_dir = frame.calibration_dir(kitti_root);
        let velodyne_file = frame.velodyne_file(kitti_root);
        debug!(index, velodyne = %velodyne_file.display(), "frame");
        let depth_map = generate_depth_map(
            &calibration_dir,
            &velodyne_file,
            config.camera,
            config.use_velodyne_depth,
        );
        match depth_map {
            Ok(depth_map) => depth_maps.push(depth_map.map(|d| d as f32)),
            Err(error) if config.skip_failed => {
                warn!(index, %error, "skipping frame");
                skipped += 1;
                depth_maps.push(DMatrix::zeros(0, 0));
            }
            Err(error) => {
                bar.abandon();
                return Err(error);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok((depth_maps, skipped))
}

/// Parse split files listing the frames of a dataset split.
///
/// Two line formats are accepted:
///
/// - `2011_09_26/2011_09_26_drive_0002_sync/image_02/data/0000000069`
///   (file extension optional),
/// - `2011_09_26/2011_09_26_drive_0002_sync 69` (optional trailing side, `l` or `r`).
pub mod parse {
    use super::FrameDescriptor;
    use crate::error::{Error, Result};
    use nom::{
        branch::alt,
        bytes::complete::is_not,
        character::complete::{alpha1, alphanumeric1, char, digit1, space0, space1},
        combinator::{all_consuming, map, map_res, opt},
        sequence::{delimited, preceded, tuple},
        IResult,
    };

    /// Parse a split file into a vector of `FrameDescriptor`.
    /// Blank lines are ignored.
    pub fn split(file_content: &str) -> Result<Vec<FrameDescriptor>> {
        let mut frames = Vec::new();
        for (number, line) in file_content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let frame = split_line(line).ok_or_else(|| Error::SplitLine {
                line_number: number + 1,
                line: line.to_string(),
            })?;
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Parse one line of a split file.
    pub fn split_line(line: &str) -> Option<FrameDescriptor> {
        all_consuming(delimited(
            space0,
            alt((image_path_line, drive_frame_line)),
            space0,
        ))(line)
        .ok()
        .map(|(_, frame)| frame)
    }

    // nom parsers #############################################################

    // Path of the image: date/drive/image_0X/data/frame[.ext]
    fn image_path_line(input: &str) -> IResult<&str, FrameDescriptor> {
        map(
            tuple((
                component,
                char('/'),
                component,
                char('/'),
                component,
                char('/'),
                component,
                char('/'),
                frame_index,
                opt(preceded(char('.'), alphanumeric1)),
            )),
            |(date, _, drive, _, _, _, _, _, frame_index, _)| descriptor(date, drive, frame_index),
        )(input)
    }

    // Drive and frame index: date/drive frame [side]
    fn drive_frame_line(input: &str) -> IResult<&str, FrameDescriptor> {
        map(
            tuple((
                component,
                char('/'),
                component,
                space1,
                frame_index,
                opt(preceded(space1, alpha1)),
            )),
            |(date, _, drive, _, frame_index, _)| descriptor(date, drive, frame_index),
        )(input)
    }

    fn component(input: &str) -> IResult<&str, &str> {
        is_not("/ \t\r\n")(input)
    }

    fn frame_index(input: &str) -> IResult<&str, usize> {
        map_res(digit1, str::parse)(input)
    }

    fn descriptor(date: &str, drive: &str, frame_index: usize) -> FrameDescriptor {
        FrameDescriptor {
            date: date.to_string(),
            drive: drive.to_string(),
            frame_index,
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::error::Error;

    fn frame_69() -> FrameDescriptor {
        FrameDescriptor {
            date: "2011_09_26".to_string(),
            drive: "2011_09_26_drive_0002_sync".to_string(),
            frame_index: 69,
        }
    }

    #[test]
    fn image_path_line() {
        let line = "2011_09_26/2011_09_26_drive_0002_sync/image_02/data/0000000069";
        assert_eq!(Some(frame_69()), parse::split_line(line));
        let line = "2011_09_26/2011_09_26_drive_0002_sync/image_02/data/0000000069.png";
        assert_eq!(Some(frame_69()), parse::split_line(line));
    }

    #[test]
    fn drive_frame_line() {
        let line = "2011_09_26/2011_09_26_drive_0002_sync 69";
        assert_eq!(Some(frame_69()), parse::split_line(line));
        let line = "2011_09_26/2011_09_26_drive_0002_sync 0000000069 l";
        assert_eq!(Some(frame_69()), parse::split_line(line));
        let line = "  2011_09_26/2011_09_26_drive_0002_sync\t69 ";
        assert_eq!(Some(frame_69()), parse::split_line(line));
    }

    #[test]
    fn invalid_lines() {
        assert_eq!(None, parse::split_line("2011_09_26 69"));
        assert_eq!(None, parse::split_line("2011_09_26/drive/image_02/data/frame"));
        assert_eq!(None, parse::split_line("2011_09_26/drive 69 l extra"));
    }

    #[test]
    fn split_file() {
        let content = "2011_09_26/2011_09_26_drive_0002_sync 69 l\n\n\
                       2011_09_26/2011_09_26_drive_0002_sync/image_02/data/0000000069\n";
        assert_eq!(vec![frame_69(), frame_69()], parse::split(content).unwrap());
    }

    #[test]
    fn split_error_line_number() {
        let content = "2011_09_26/2011_09_26_drive_0002_sync 69\n\noops\n";
        match parse::split(content) {
            Err(Error::SplitLine { line_number, line }) => {
                assert_eq!(3, line_number);
                assert_eq!("oops", line);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn frame_paths() {
        let frame = frame_69();
        assert_eq!(PathBuf::from("kitti/2011_09_26"), frame.calibration_dir("kitti"));
        assert_eq!(
            PathBuf::from(
                "kitti/2011_09_26/2011_09_26_drive_0002_sync/velodyne_points/data/0000000069.bin"
            ),
            frame.velodyne_file("kitti")
        );
    }
}
