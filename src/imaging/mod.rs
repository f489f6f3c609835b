//! Image processing: pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Composite** | inverse-mapped bilinear draw, rows on `rayon` |
//! | **Filters** | CSS Filter Effects matrices + premultiplied Gaussian blur |
//! | **Export → PNG** | `image::ImageFormat::Png` |
//! | **Service prep → JPEG** | Lanczos3 + `JpegEncoder` |
//! | **Mask overlay** | tinted blend of a [`Mask`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for rotation, canvas and filter math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
pub mod calculations;
pub mod filters;
mod image_ref;
pub mod mask;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{canvas_dimensions, filter_pass, normalize_rotation};
pub use image_ref::ImageRef;
pub use mask::Mask;
pub use operations::{ExportedImage, UploadPrep};
pub(crate) use params::css_number;
pub use params::{DownscaleParams, Filter, FilterPass, Intensity, Quality, RenderParams};
pub use rust_backend::{RustBackend, media_type_for_path, supported_media_types};
