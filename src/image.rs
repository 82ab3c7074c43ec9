// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::Error;
use ::image::{DynamicImage, ImageFormat, RgbaImage};
use core::fmt;
use std::{fs, path::Path};
use tracing::debug;

/// Four character code identifying a pixel layout.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

/// NV21 4:2:0 YUV semi-planar format (Android camera preview format)
pub const NV21: FourCC = FourCC(*b"NV21");

/// RGBA 32-bit pixel format (8 bits per channel, with alpha)
pub const RGBA: FourCC = FourCC(*b"RGBA");

/// 8-bit single channel luma
pub const GREY: FourCC = FourCC(*b"GREY");

const fn format_row_stride(format: FourCC, width: u32) -> usize {
    match format {
        NV21 => width as usize / 2 + width as usize,
        RGBA => 4 * width as usize,
        GREY => width as usize,
        _ => 0,
    }
}

/// Size in bytes of a `width`x`height` image in `format`.
pub const fn image_size(width: u32, height: u32, format: FourCC) -> usize {
    format_row_stride(format, width) * height as usize
}

/// Validated frame dimensions.
///
/// NV21 shares each chroma pair across a 2x2 luma block, so both dimensions
/// must be positive and even.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    width: u32,
    height: u32,
}

impl Geometry {
    /// Creates a geometry for a `width`x`height` frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGeometry`] if either dimension is zero or odd,
    /// or the RGBA buffer size does not fit in `usize`.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        // the RGBA size bounds the NV21 and luma sizes
        let rgba_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(4));
        let reason = if width == 0 || height == 0 {
            "dimensions must be positive"
        } else if width % 2 != 0 || height % 2 != 0 {
            "dimensions must be even for 4:2:0 chroma"
        } else if rgba_len.is_none() {
            "frame size overflows usize"
        } else {
            return Ok(Self { width, height });
        };
        Err(Error::InvalidGeometry {
            width,
            height,
            reason: reason.to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn nv21_len(&self) -> usize {
        image_size(self.width, self.height, NV21)
    }

    pub fn rgba_len(&self) -> usize {
        image_size(self.width, self.height, RGBA)
    }

    pub fn gray_len(&self) -> usize {
        image_size(self.width, self.height, GREY)
    }

    /// Checks that an input buffer of `len` bytes holds a full NV21 frame.
    pub fn check_nv21(&self, len: usize) -> Result<(), Error> {
        if len < self.nv21_len() {
            return Err(Error::InvalidGeometry {
                width: self.width,
                height: self.height,
                reason: format!(
                    "nv21 buffer holds {len} bytes, expected {}",
                    self.nv21_len()
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[inline]
fn clamp(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Fixed-point BT.601 conversion of one luma sample with its chroma pair,
/// `u` and `v` already centered on zero.
#[inline]
fn yuv_to_rgb(y: u8, u: i32, v: i32) -> [u8; 3] {
    let y1192 = (1192 * (i32::from(y) - 16)).max(0);
    let r = (y1192 + 1634 * v) >> 10;
    let g = (y1192 - 833 * v - 400 * u) >> 10;
    let b = (y1192 + 2066 * u) >> 10;
    [clamp(r), clamp(g), clamp(b)]
}

/// Converts an NV21 frame to packed RGBA.
///
/// Chroma is upsampled nearest-neighbor: each V/U pair is read at even
/// columns and reused for the following odd column, and each chroma row
/// serves two luma rows. Alpha is always 255.
///
/// # Panics
///
/// Panics if `nv21` is shorter than `width * height * 3 / 2` bytes or
/// `width` is odd. Use [`Geometry`] to validate untrusted dimensions.
pub fn nv21_to_rgba(nv21: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgba = vec![0u8; image_size(width, height, RGBA)];
    nv21_to_rgba_into(nv21, width, height, &mut rgba);
    rgba
}

/// Same as [`nv21_to_rgba`] but writes into an existing RGBA buffer of at
/// least `width * height * 4` bytes.
pub fn nv21_to_rgba_into(nv21: &[u8], width: u32, height: u32, rgba: &mut [u8]) {
    let width = width as usize;
    let frame_size = width * height as usize;

    for (j, row) in rgba[..frame_size * 4]
        .chunks_exact_mut(width * 4)
        .enumerate()
    {
        let luma = &nv21[j * width..(j + 1) * width];
        let uvp = frame_size + (j >> 1) * width;
        let chroma = &nv21[uvp..uvp + width];

        let (mut u, mut v) = (0, 0);
        for (i, (&y, px)) in luma.iter().zip(row.chunks_exact_mut(4)).enumerate() {
            if i & 1 == 0 {
                v = i32::from(chroma[i]) - 128;
                u = i32::from(chroma[i + 1]) - 128;
            }
            let [r, g, b] = yuv_to_rgb(y, u, v);
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }
}

/// Extracts BT.601 luma from packed RGBA, truncating to an integer.
pub fn rgba_to_gray(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixels = image_size(width, height, GREY);
    rgba[..pixels * 4]
        .chunks_exact(4)
        .map(|px| {
            let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
            (0.299 * r + 0.587 * g + 0.114 * b) as u8
        })
        .collect()
}

/// Expands single channel luma to packed RGBA with equal color channels.
pub fn gray_to_rgba(gray: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixels = image_size(width, height, GREY);
    let mut rgba = Vec::with_capacity(pixels * 4);
    for &v in &gray[..pixels] {
        rgba.extend_from_slice(&[v, v, v, 255]);
    }
    rgba
}

/// Saves a packed RGBA buffer to `path`.
///
/// PNG and JPEG are selected from the file extension; JPEG drops the alpha
/// channel. Any other extension writes the raw RGBA bytes unchanged.
///
/// # Errors
///
/// Returns an error if `pix` does not hold a `width`x`height` RGBA image,
/// encoding fails or the file cannot be written.
pub fn save_rgba(path: &Path, pix: &[u8], width: u32, height: u32) -> Result<(), Error> {
    let format = ImageFormat::from_path(path).ok();
    if !matches!(format, Some(ImageFormat::Png) | Some(ImageFormat::Jpeg)) {
        debug!(path = %path.display(), len = pix.len(), "writing raw rgba");
        fs::write(path, pix)?;
        return Ok(());
    }

    let img = RgbaImage::from_raw(width, height, pix.to_vec()).ok_or_else(|| {
        Error::InvalidGeometry {
            width,
            height,
            reason: format!("rgba buffer holds {} bytes", pix.len()),
        }
    })?;

    match format {
        Some(ImageFormat::Jpeg) => DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, ImageFormat::Jpeg)?,
        _ => img.save_with_format(path, ImageFormat::Png)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv_to_rgb_extremes() {
        assert_eq!(yuv_to_rgb(0, 0, 0), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(16, 0, 0), [0, 0, 0]);
        assert_eq!(yuv_to_rgb(255, 0, 0), [255, 255, 255]);
        assert_eq!(yuv_to_rgb(235, 0, 0), [254, 254, 254]);

        // Saturated chroma pushes the raw sums outside the byte range.
        assert_eq!(yuv_to_rgb(255, 127, 127), [255, 125, 255]);
        assert_eq!(yuv_to_rgb(0, -128, -128), [0, 154, 0]);
        assert_eq!(yuv_to_rgb(128, -128, 127), [255, 77, 0]);
    }

    #[test]
    fn test_geometry() {
        let g = Geometry::new(640, 480).unwrap();
        assert_eq!(g.nv21_len(), 460800);
        assert_eq!(g.rgba_len(), 1228800);
        assert_eq!(g.gray_len(), 307200);
        assert_eq!(g.to_string(), "640x480");

        assert!(Geometry::new(0, 480).is_err());
        assert!(Geometry::new(641, 480).is_err());
        assert!(Geometry::new(640, 479).is_err());
        assert!(g.check_nv21(460799).is_err());
        assert!(g.check_nv21(460800).is_ok());
    }

    #[test]
    fn test_geometry_overflow() {
        match Geometry::new(0xFFFF_FFFE, 0xFFFF_FFFE) {
            Err(Error::InvalidGeometry { reason, .. }) => assert!(reason.contains("overflows")),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_fourcc_display() {
        assert_eq!(NV21.to_string(), "NV21");
        assert_eq!(format!("{:?}", RGBA), "FourCC(RGBA)");
    }
}
