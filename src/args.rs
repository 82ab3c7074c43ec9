// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_edgeproc::{image::Geometry, Error};
use std::path::PathBuf;

/// Command-line arguments for the EdgeFirst edge processor.
///
/// Processes raw NV21 frames from a file through the edge viewer pipeline
/// and saves the last processed frame. Arguments can be specified via command
/// line or environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// edgeproc --input capture.nv21 --size 640 480 --output edges.png
///
/// # Via environment variables
/// export INPUT=capture.nv21
/// export FRAME_SIZE="1280 720"
/// edgeproc
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Raw NV21 input file holding one or more frames back to back
    #[arg(short, long, env = "INPUT")]
    pub input: PathBuf,

    /// Frame resolution in pixels (width height)
    #[arg(
        long,
        env = "FRAME_SIZE",
        default_value = "640 480",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub size: Vec<u32>,

    /// Output file, .png and .jpg are encoded and anything else is raw RGBA
    #[arg(short, long, env = "OUTPUT", default_value = "edges.png")]
    pub output: PathBuf,

    /// Output buffer resolution in pixels when it differs from the frame
    /// (width height)
    #[arg(long, env = "OUTPUT_SIZE", value_delimiter = ' ', num_args = 2)]
    pub output_size: Option<Vec<u32>>,

    /// Disable edge detection and always emit grayscale
    #[arg(long, env = "NO_EDGES")]
    pub no_edges: bool,

    /// Number of frames averaged for the reported frame rate
    #[arg(long, env = "FPS_WINDOW", default_value = "30")]
    pub fps_window: usize,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Send logs to the systemd journal
    #[arg(long, env = "JOURNALD")]
    pub journald: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}

/// Splits a `width height` argument, which clap only enforces on the
/// command line and not for values taken from the environment.
fn dims(values: &[u32]) -> Result<(u32, u32), Error> {
    match values {
        [width, height] => Ok((*width, *height)),
        _ => Err(Error::InvalidGeometry {
            width: values.first().copied().unwrap_or(0),
            height: values.get(1).copied().unwrap_or(0),
            reason: format!("expected \"width height\", got {} values", values.len()),
        }),
    }
}

impl Args {
    pub fn frame_geometry(&self) -> Result<Geometry, Error> {
        let (width, height) = dims(&self.size)?;
        Geometry::new(width, height)
    }

    /// Dimensions of the output buffer, defaulting to the frame size.
    pub fn output_dims(&self) -> Result<(u32, u32), Error> {
        dims(self.output_size.as_deref().unwrap_or(self.size.as_slice()))
    }

    pub fn output_len(&self) -> Result<usize, Error> {
        let (width, height) = self.output_dims()?;
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4))
            .ok_or_else(|| Error::InvalidGeometry {
                width,
                height,
                reason: "output size overflows usize".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["edgeproc", "--input", "frame.nv21"]).unwrap();
        assert_eq!(args.size, vec![640, 480]);
        assert_eq!(args.output, PathBuf::from("edges.png"));
        assert_eq!(args.output_dims().unwrap(), (640, 480));
        assert_eq!(args.output_len().unwrap(), 640 * 480 * 4);
        assert!(!args.no_edges);
    }

    #[test]
    fn test_output_size() {
        let args = Args::try_parse_from([
            "edgeproc",
            "--input",
            "frame.nv21",
            "--size",
            "4",
            "2",
            "--output-size",
            "2",
            "2",
            "--no-edges",
        ])
        .unwrap();
        assert_eq!(args.frame_geometry().unwrap().rgba_len(), 32);
        assert_eq!(args.output_dims().unwrap(), (2, 2));
        assert_eq!(args.output_len().unwrap(), 16);
        assert!(args.no_edges);
    }

    #[test]
    fn test_odd_size_rejected() {
        let args =
            Args::try_parse_from(["edgeproc", "--input", "frame.nv21", "--size", "5", "4"])
                .unwrap();
        assert!(args.frame_geometry().is_err());
    }

    #[test]
    fn test_single_value_size_rejected() {
        // FRAME_SIZE=640 or OUTPUT_SIZE=2 from the environment bypass num_args
        let mut args =
            Args::try_parse_from(["edgeproc", "--input", "frame.nv21", "--size", "4", "2"])
                .unwrap();
        args.output_size = Some(vec![2]);
        assert!(matches!(
            args.output_dims(),
            Err(Error::InvalidGeometry { width: 2, height: 0, .. })
        ));
        assert!(args.output_len().is_err());

        args.size = vec![640];
        assert!(args.frame_geometry().is_err());
        args.output_size = None;
        assert!(args.output_dims().is_err());
    }
}
