//! The one representation of "an image" that flows through the editor.
//!
//! An [`ImageRef`] is encoded bytes plus the facts learned by decoding them
//! once: container format and natural size. Uploads, resets, service
//! replacements and exports all exchange `ImageRef`s, so there is never a
//! question of whether a value is raw bytes, a decoded buffer or a URL.
//!
//! The bytes live behind an `Arc`, so keeping the same image as both
//! original and current costs one allocation.

use super::backend::Dimensions;
use image::ImageFormat;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ImageRef {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    natural: Dimensions,
}

impl ImageRef {
    /// Wrap already-validated bytes.
    ///
    /// Backends call this after a successful decode; `natural` must be the
    /// decoded size of `bytes`.
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: ImageFormat, natural: Dimensions) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            natural,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Size the bytes decode to, before any resize.
    pub fn natural(&self) -> Dimensions {
        self.natural
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type of the encoded bytes, e.g. `image/png`.
    pub fn media_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// True when both refs point at the same allocation.
    pub fn shares_bytes_with(&self, other: &ImageRef) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format
            && self.natural == other.natural
            && (self.shares_bytes_with(other) || self.bytes == other.bytes)
    }
}

impl Eq for ImageRef {}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRef")
            .field("format", &self.format)
            .field("natural", &self.natural)
            .field("len", &self.bytes.len())
            .finish()
    }
}
