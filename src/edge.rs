// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Canny edge maps over a pluggable vision backend.
//!
//! The detector never lets a backend error or panic escape: every failure is
//! reported as [`EdgeOutcome::Failed`] so the caller can fall back to
//! grayscale without a partially written buffer.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};
use tracing::{debug, trace};

/// Canny lower hysteresis threshold.
pub const CANNY_LOW: f32 = 80.0;

/// Canny upper hysteresis threshold.
pub const CANNY_HIGH: f32 = 160.0;

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("buffer of {len} bytes does not hold a {width}x{height} image")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("vision backend: {0}")]
    Backend(String),
}

/// Operations an external vision library provides for edge detection.
///
/// All buffers are tightly packed and row-major: color buffers are RGBA,
/// gray buffers hold one byte per pixel.
pub trait VisionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Converts packed RGBA to single channel luma.
    fn color_to_gray(&self, rgba: &[u8], width: u32, height: u32)
        -> Result<Vec<u8>, VisionError>;

    /// Runs a binary edge operator with hysteresis thresholds `low` and
    /// `high`. Output pixels are 0 or 255.
    fn edge_operator(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        low: f32,
        high: f32,
    ) -> Result<Vec<u8>, VisionError>;

    /// Replicates single channel luma into packed RGBA with opaque alpha.
    fn gray_to_color(&self, gray: &[u8], width: u32, height: u32)
        -> Result<Vec<u8>, VisionError>;
}

/// Result of one edge detection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Packed RGBA edge map.
    Success(Vec<u8>),
    /// No vision backend is available.
    Unavailable,
    /// The backend reported an error or panicked.
    Failed(String),
}

/// Edge detector wrapping a [`VisionBackend`].
pub struct EdgeDetector {
    backend: Box<dyn VisionBackend>,
}

impl fmt::Debug for EdgeDetector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EdgeDetector")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl EdgeDetector {
    pub fn new(backend: impl VisionBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Returns the detector built into this crate, or `None` when it was
    /// compiled without a vision backend.
    pub fn system() -> Option<Self> {
        #[cfg(feature = "imageproc")]
        {
            Some(Self::new(ImageprocBackend))
        }
        #[cfg(not(feature = "imageproc"))]
        {
            None
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Computes a packed RGBA edge map of a `width`x`height` RGBA image.
    pub fn detect(&self, rgba: &[u8], width: u32, height: u32) -> EdgeOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(rgba, width, height))) {
            Ok(Ok(edges)) => EdgeOutcome::Success(edges),
            Ok(Err(err)) => EdgeOutcome::Failed(err.to_string()),
            Err(payload) => EdgeOutcome::Failed(panic_message(payload.as_ref())),
        }
    }

    fn run(&self, rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, VisionError> {
        let gray = self.backend.color_to_gray(rgba, width, height)?;
        let edges = self
            .backend
            .edge_operator(&gray, width, height, CANNY_LOW, CANNY_HIGH)?;
        trace!(backend = self.backend.name(), "edge operator finished");
        self.backend.gray_to_color(&edges, width, height)
    }
}

/// Attempts edge detection with an optional detector.
pub fn detect_edges(
    detector: Option<&EdgeDetector>,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> EdgeOutcome {
    match detector {
        Some(detector) => detector.detect(rgba, width, height),
        None => {
            debug!("no edge detector available");
            EdgeOutcome::Unavailable
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("vision backend panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("vision backend panicked: {msg}")
    } else {
        "vision backend panicked".to_string()
    }
}

#[cfg(feature = "imageproc")]
pub use self::imageproc_backend::ImageprocBackend;

#[cfg(feature = "imageproc")]
mod imageproc_backend {
    use super::{VisionBackend, VisionError};
    use ::image::{DynamicImage, GrayImage, RgbaImage};

    /// Vision backend built on the `image` and `imageproc` crates.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct ImageprocBackend;

    fn sized(
        buf: &[u8],
        width: u32,
        height: u32,
        channels: usize,
    ) -> Result<Vec<u8>, VisionError> {
        let len = width as usize * height as usize * channels;
        buf.get(..len)
            .map(<[u8]>::to_vec)
            .ok_or(VisionError::BufferSize {
                width,
                height,
                len: buf.len(),
            })
    }

    fn gray_image(gray: &[u8], width: u32, height: u32) -> Result<GrayImage, VisionError> {
        GrayImage::from_raw(width, height, sized(gray, width, height, 1)?).ok_or(
            VisionError::BufferSize {
                width,
                height,
                len: gray.len(),
            },
        )
    }

    impl VisionBackend for ImageprocBackend {
        fn name(&self) -> &str {
            "imageproc"
        }

        fn color_to_gray(
            &self,
            rgba: &[u8],
            width: u32,
            height: u32,
        ) -> Result<Vec<u8>, VisionError> {
            let img = RgbaImage::from_raw(width, height, sized(rgba, width, height, 4)?).ok_or(
                VisionError::BufferSize {
                    width,
                    height,
                    len: rgba.len(),
                },
            )?;
            Ok(DynamicImage::ImageRgba8(img).into_luma8().into_raw())
        }

        fn edge_operator(
            &self,
            gray: &[u8],
            width: u32,
            height: u32,
            low: f32,
            high: f32,
        ) -> Result<Vec<u8>, VisionError> {
            if low > high {
                return Err(VisionError::Backend(format!(
                    "low threshold {low} exceeds high threshold {high}"
                )));
            }
            let img = gray_image(gray, width, height)?;
            Ok(imageproc::edges::canny(&img, low, high).into_raw())
        }

        fn gray_to_color(
            &self,
            gray: &[u8],
            width: u32,
            height: u32,
        ) -> Result<Vec<u8>, VisionError> {
            let img = gray_image(gray, width, height)?;
            Ok(DynamicImage::ImageLuma8(img).into_rgba8().into_raw())
        }
    }
}
