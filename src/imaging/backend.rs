//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: decode, render, downscale and mask overlay.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so session logic can be checked without
//! touching pixels.

use super::image_ref::ImageRef;
use super::mask::Mask;
use super::params::{DownscaleParams, RenderParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all four operations so the rest of the
/// codebase is backend-agnostic.
pub trait ImageBackend: Sync {
    /// Fully decode `bytes` and wrap them as an [`ImageRef`].
    ///
    /// This is the only way bytes become an image the editor will store, so
    /// implementations must reject anything that does not decode.
    fn decode(&self, bytes: Vec<u8>) -> Result<ImageRef, BackendError>;

    /// Composite the source onto a canvas and encode it as PNG.
    fn render(&self, params: &RenderParams) -> Result<Vec<u8>, BackendError>;

    /// Shrink the source to fit the bounds and re-encode it as JPEG.
    fn downscale(&self, params: &DownscaleParams) -> Result<Vec<u8>, BackendError>;

    /// Tint the selected mask pixels over the image and encode it as PNG.
    fn overlay_mask(&self, image: &ImageRef, mask: &Mask) -> Result<Vec<u8>, BackendError>;
}
