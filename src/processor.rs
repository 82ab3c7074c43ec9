// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    edge::{detect_edges, EdgeDetector, EdgeOutcome},
    image::{gray_to_rgba, nv21_to_rgba, rgba_to_gray, Geometry},
    Error,
};
use core::fmt;
use tracing::{debug, instrument, warn};

/// Why a frame was committed through the grayscale path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No edge detector is configured.
    Unavailable,
    /// The edge detector reported an error.
    Failed(String),
    /// The edge map does not match the caller's output buffer.
    SizeMismatch { produced: usize, expected: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FallbackReason::Unavailable => write!(f, "edge detection unavailable"),
            FallbackReason::Failed(reason) => write!(f, "edge detection failed: {reason}"),
            FallbackReason::SizeMismatch { produced, expected } => write!(
                f,
                "edge map is {produced} bytes but output holds {expected}"
            ),
        }
    }
}

/// The path committed to the output buffer for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessPath {
    Edges,
    Grayscale(FallbackReason),
}

/// Per-frame NV21 to edge map pipeline with grayscale fallback.
///
/// Each call converts the frame to RGBA, attempts edge detection once and
/// commits exactly one result to the output buffer. No state is kept
/// between frames.
///
/// # Example
///
/// ```
/// use edgefirst_edgeproc::{FallbackReason, FrameProcessor, ProcessPath};
///
/// let processor = FrameProcessor::new(None);
/// let nv21 = vec![128u8; 4 * 2 * 3 / 2];
/// let mut rgba = vec![0u8; 4 * 2 * 4];
///
/// let path = processor.process(&nv21, 4, 2, &mut rgba).unwrap();
/// assert_eq!(path, ProcessPath::Grayscale(FallbackReason::Unavailable));
/// ```
#[derive(Debug)]
pub struct FrameProcessor {
    detector: Option<EdgeDetector>,
}

impl FrameProcessor {
    pub fn new(detector: Option<EdgeDetector>) -> Self {
        Self { detector }
    }

    /// Creates a processor using [`EdgeDetector::system`].
    pub fn system() -> Self {
        Self::new(EdgeDetector::system())
    }

    pub fn detector(&self) -> Option<&EdgeDetector> {
        self.detector.as_ref()
    }

    /// Processes one NV21 frame into `output`.
    ///
    /// The edge map is committed only when detection succeeds and its length
    /// equals `output.len()`. Otherwise the grayscale image is committed,
    /// copying at most `output.len()` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if `width`/`height` are not positive
    /// even values or `nv21` holds fewer than `width * height * 3 / 2` bytes.
    /// The output buffer is left untouched in that case.
    #[instrument(
        level = "debug",
        skip(self, nv21, output),
        fields(output_len = output.len())
    )]
    pub fn process(
        &self,
        nv21: &[u8],
        width: u32,
        height: u32,
        output: &mut [u8],
    ) -> Result<ProcessPath, Error> {
        let geometry = Geometry::new(width, height)?;
        geometry.check_nv21(nv21.len())?;

        // owned copy of the caller's frame
        let frame = nv21[..geometry.nv21_len()].to_vec();
        let rgba = nv21_to_rgba(&frame, width, height);

        let reason = match detect_edges(self.detector.as_ref(), &rgba, width, height) {
            EdgeOutcome::Success(edges) if edges.len() == output.len() => {
                output.copy_from_slice(&edges);
                return Ok(ProcessPath::Edges);
            }
            EdgeOutcome::Success(edges) => FallbackReason::SizeMismatch {
                produced: edges.len(),
                expected: output.len(),
            },
            EdgeOutcome::Unavailable => FallbackReason::Unavailable,
            EdgeOutcome::Failed(reason) => {
                warn!("edge detection failed: {reason}");
                FallbackReason::Failed(reason)
            }
        };
        debug!("falling back to grayscale: {reason}");

        let gray = rgba_to_gray(&rgba, width, height);
        let fallback = gray_to_rgba(&gray, width, height);
        let len = fallback.len().min(output.len());
        output[..len].copy_from_slice(&fallback[..len]);

        Ok(ProcessPath::Grayscale(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_geometry_leaves_output() {
        let processor = FrameProcessor::new(None);
        let mut out = vec![7u8; 32];

        let err = processor.process(&[128; 12], 3, 2, &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { width: 3, .. }));

        let err = processor.process(&[128; 11], 4, 2, &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { height: 2, .. }));

        assert!(out.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_oversized_geometry_rejected() {
        let processor = FrameProcessor::new(None);
        let mut out = vec![7u8; 32];

        let err = processor
            .process(&[0; 12], 0xFFFF_FFFE, 0xFFFF_FFFE, &mut out)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { .. }));
        assert!(out.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_fallback_short_output() {
        let processor = FrameProcessor::new(None);
        let mut out = vec![7u8; 20];
        let path = processor.process(&[128; 12], 4, 2, &mut out).unwrap();
        assert_eq!(path, ProcessPath::Grayscale(FallbackReason::Unavailable));
        for px in out.chunks_exact(4) {
            assert_eq!(px[3], 255);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn test_fallback_long_output() {
        let processor = FrameProcessor::new(None);
        let mut out = vec![7u8; 40];
        processor.process(&[128; 12], 4, 2, &mut out).unwrap();
        assert!(out[..32].chunks_exact(4).all(|px| px[3] == 255));
        assert!(out[32..].iter().all(|&b| b == 7));
    }

    #[test]
    fn test_reason_display() {
        let reason = FallbackReason::SizeMismatch {
            produced: 32,
            expected: 64,
        };
        assert_eq!(reason.to_string(), "edge map is 32 bytes but output holds 64");
    }
}
