// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use std::{error::Error, path::PathBuf};

use kitti_depth_rs as kdrs;
use kdrs::dataset::kitti;

/// Generate the ground truth depth maps of every frame of a KITTI split.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Root directory of the KITTI raw dataset.
    #[arg(long)]
    kitti: PathBuf,

    /// Directory containing the split file, where the archive is written.
    #[arg(long)]
    split: PathBuf,

    /// Camera whose rectified image depth maps are aligned with.
    #[arg(long, default_value_t = 2)]
    camera: usize,

    /// Use the projective depth instead of the velodyne forward distance.
    #[arg(long)]
    projective_depth: bool,

    /// Name of the split file in the split directory.
    #[arg(long, default_value = "test_files.txt")]
    split_file: String,

    /// Name of the archive written in the split directory.
    #[arg(long, default_value = "depths.tar.gz")]
    output: String,

    /// Store an empty depth map for failing frames instead of aborting.
    #[arg(long)]
    skip_failed: bool,

    /// Do not display the progress bar.
    #[arg(long)]
    no_progress: bool,
}

fn main() {
    // Set RUST_LOG to control the log level, "info" by default.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Args::parse()) {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = kitti::Config {
        camera: args.camera,
        use_velodyne_depth: !args.projective_depth,
        split_file: args.split_file,
        archive_file: args.output,
        skip_failed: args.skip_failed,
        progress: !args.no_progress,
    };
    let summary = kitti::generate_ground_truth(&args.kitti, &args.split, &config)?;
    println!(
        "{} depth maps written to {} ({} skipped)",
        summary.frames,
        args.split.join(&config.archive_file).display(),
        summary.skipped
    );
    Ok(())
}
