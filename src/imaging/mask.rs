//! Binary selection masks produced by a segmentation collaborator.
//!
//! A [`Mask`] is a single-channel image where 255 marks a selected pixel and 0
//! an unselected one. Masks arrive in one of three shapes:
//!
//! - raw model logits (`from_logits`), selected where the logit is positive;
//! - an encoded image (`from_encoded`), either black/white or the coloured
//!   overlay a segmentation UI draws on a transparent background;
//! - an in-memory `GrayImage` (`from_gray`).
//!
//! Inpainting services receive the mask as a black/white PNG.

use super::backend::{BackendError, Dimensions};
use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

/// Colour used to paint the selection in preview overlays.
pub const OVERLAY_TINT: [u8; 4] = [0, 114, 189, 255];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    pub fn from_gray(gray: GrayImage) -> Self {
        let pixels = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > 127 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        Self { pixels }
    }

    /// Threshold model output at zero.
    ///
    /// `logits` is row-major, `width * height` long.
    pub fn from_logits(logits: &[f32], width: u32, height: u32) -> Result<Self, BackendError> {
        let expected = width as usize * height as usize;
        if logits.len() != expected || expected == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "mask logits have {} values, expected {width}x{height}",
                logits.len()
            )));
        }
        let pixels = GrayImage::from_fn(width, height, |x, y| {
            let idx = y as usize * width as usize + x as usize;
            if logits[idx] > 0.0 { Luma([255]) } else { Luma([0]) }
        });
        Ok(Self { pixels })
    }

    /// Decode an encoded mask image.
    ///
    /// A pixel is selected when it is mostly opaque and its brightest channel
    /// is above mid-grey, which covers both white-on-black masks and coloured
    /// overlays on transparency.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, BackendError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let pixels = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            if a > 127 && r.max(g).max(b) > 127 {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        Ok(Self { pixels })
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        x < self.pixels.width() && y < self.pixels.height() && self.pixels.get_pixel(x, y)[0] > 0
    }

    pub fn selected_count(&self) -> usize {
        self.pixels.pixels().filter(|p| p[0] > 0).count()
    }

    /// Nearest-neighbour resample, keeping the mask strictly binary.
    pub fn scaled_to(&self, size: Dimensions) -> Mask {
        if size == self.dimensions() {
            return self.clone();
        }
        let pixels = image::imageops::resize(
            &self.pixels,
            size.width,
            size.height,
            image::imageops::FilterType::Nearest,
        );
        Self { pixels }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// Encode as a black/white PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, BackendError> {
        let mut buf = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| BackendError::ProcessingFailed(format!("mask encode failed: {e}")))?;
        Ok(buf.into_inner())
    }
}
