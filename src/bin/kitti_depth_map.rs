// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use std::{error::Error, path::PathBuf};

use kitti_depth_rs as kdrs;
use kdrs::core::depth_map;
use kdrs::misc::{helper, view};

/// Project one velodyne frame into a camera and save the depth map as a 16 bits png.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory with calib_cam_to_cam.txt and calib_velo_to_cam.txt.
    #[arg(long)]
    calibration: PathBuf,

    /// Velodyne point cloud file (.bin).
    #[arg(long)]
    velodyne: PathBuf,

    /// Output 16 bits png, depth in meters scaled by 256.
    #[arg(long)]
    output: PathBuf,

    /// Camera whose rectified image the depth map is aligned with.
    #[arg(long, default_value_t = 2)]
    camera: usize,

    /// Use the velodyne forward distance instead of the projective depth.
    #[arg(long)]
    velodyne_depth: bool,

    /// Also save an 8 bits preview of the inverse depth.
    #[arg(long)]
    preview: Option<PathBuf>,
}

fn main() {
    // Set RUST_LOG to control the log level, "info" by default.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let depth_map = depth_map::generate_depth_map(
        &args.calibration,
        &args.velodyne,
        args.camera,
        args.velodyne_depth,
    )?;
    let nb_valid = depth_map.iter().filter(|d| **d > 0.0).count();
    tracing::info!(
        height = depth_map.nrows(),
        width = depth_map.ncols(),
        nb_valid,
        "depth map generated"
    );

    helper::write_depth_png(&args.output, &depth_map)?;
    if let Some(preview_path) = args.preview {
        view::depth_preview(&depth_map).save(&preview_path)?;
    }
    Ok(())
}
