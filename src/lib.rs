// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst Edge Processor Library
//!
//! This library turns raw camera frames into displayable buffers for an edge
//! viewer. Each NV21 (YUV 4:2:0 semi-planar) frame is converted to packed
//! RGBA, run through a Canny edge operator when a vision backend is present,
//! and otherwise reduced to grayscale so the caller always receives a fully
//! written output buffer.
//!
//! ## Features
//!
//! - **Color Conversion**: Fixed-point NV21 to RGBA conversion with
//!   nearest-neighbor chroma upsampling.
//! - **Grayscale**: BT.601 luma extraction and re-expansion to RGBA.
//! - **Edge Detection**: Canny edge maps through a pluggable
//!   [`edge::VisionBackend`], backed by `imageproc` when the `imageproc`
//!   feature is enabled.
//! - **Fallback**: Unavailable, failing or mis-sized edge detection always
//!   degrades to the grayscale path.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_edgeproc::{image::Geometry, FrameProcessor, ProcessPath};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let geometry = Geometry::new(640, 480)?;
//! let nv21 = vec![128u8; geometry.nv21_len()];
//! let mut rgba = vec![0u8; geometry.rgba_len()];
//!
//! let processor = FrameProcessor::system();
//! match processor.process(&nv21, 640, 480, &mut rgba)? {
//!     ProcessPath::Edges => println!("edge map"),
//!     ProcessPath::Grayscale(reason) => println!("grayscale: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod edge;
pub mod image;
pub mod processor;
pub mod stats;

pub use processor::{FallbackReason, FrameProcessor, ProcessPath};

/// Errors reported by the edge processor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame dimensions do not describe a valid NV21 frame or buffer.
    #[error("invalid geometry {width}x{height}: {reason}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

/// Processes one NV21 frame into `output` using the system edge detector.
///
/// This is the library counterpart of the viewer's native entry point:
/// `output` is overwritten with either the replicated edge map or the
/// grayscale fallback and the committed path is returned.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] if `width`/`height` are not positive
/// even values or `nv21` is shorter than `width * height * 3 / 2` bytes.
pub fn process_frame(
    nv21: &[u8],
    width: u32,
    height: u32,
    output: &mut [u8],
) -> Result<ProcessPath, Error> {
    FrameProcessor::system().process(nv21, width, height, output)
}
