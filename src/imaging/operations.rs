//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They read the edit document, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{EXPORT_BLUR_SCALE, filter_pass};
use super::image_ref::ImageRef;
use super::params::{DownscaleParams, Quality, RenderParams};
use crate::document::EditState;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A finished export, ready to hand to whoever saves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// Bounds and quality for images sent to an inpainting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPrep {
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}

impl Default for UploadPrep {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            quality: Quality::new(80),
        }
    }
}

/// Plan the export composite without executing it.
///
/// Returns `None` for an empty document.
pub fn plan_render(state: &EditState) -> Option<RenderParams> {
    let source = state.current()?.clone();
    let canvas = state.canvas_dimensions();
    Some(RenderParams {
        source,
        width: state.width(),
        height: state.height(),
        canvas_width: canvas.width,
        canvas_height: canvas.height,
        rotation: state.rotation(),
        flip_horizontal: state.is_flipped_horizontal(),
        flip_vertical: state.is_flipped_vertical(),
        filter: filter_pass(state.filter(), state.filter_intensity(), EXPORT_BLUR_SCALE),
    })
}

/// Composite the document and encode it as PNG.
///
/// Returns `Ok(None)` when there is nothing to export.
pub fn export(
    backend: &impl ImageBackend,
    state: &EditState,
    filename_prefix: &str,
) -> Result<Option<ExportedImage>> {
    let Some(params) = plan_render(state) else {
        return Ok(None);
    };
    let bytes = backend.render(&params)?;
    Ok(Some(ExportedImage {
        bytes,
        filename: state.export_filename(filename_prefix),
        width: params.canvas_width,
        height: params.canvas_height,
    }))
}

/// Shrink and re-encode an image before sending it to a service.
pub fn prepare_upload(
    backend: &impl ImageBackend,
    image: &ImageRef,
    prep: UploadPrep,
) -> Result<Vec<u8>> {
    backend.downscale(&DownscaleParams {
        source: image.clone(),
        max_width: prep.max_width,
        max_height: prep.max_height,
        quality: prep.quality,
    })
}

/// Decode bytes and check they produced something drawable.
pub fn decode_checked(backend: &impl ImageBackend, bytes: Vec<u8>) -> Result<ImageRef> {
    let image = backend.decode(bytes)?;
    let Dimensions { width, height } = image.natural();
    if width == 0 || height == 0 {
        return Err(BackendError::Decode(format!(
            "decoded to an empty {width}x{height} image"
        )));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Filter;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::ImageFormat;

    fn loaded(width: u32, height: u32) -> EditState {
        let mut state = EditState::new();
        let image = ImageRef::new(vec![1, 2, 3], ImageFormat::Jpeg, Dimensions::new(width, height));
        state.set_image(image, "photo.jpg").unwrap();
        state
    }

    #[test]
    fn plan_render_empty_document() {
        assert!(plan_render(&EditState::new()).is_none());
    }

    #[test]
    fn plan_render_swaps_canvas_for_quarter_turn() {
        let mut state = loaded(200, 100);
        state.rotate(90).unwrap();
        let params = plan_render(&state).unwrap();
        assert_eq!((params.width, params.height), (200, 100));
        assert_eq!((params.canvas_width, params.canvas_height), (100, 200));
        assert_eq!(params.rotation, 90);
        assert!(params.filter.is_none());
    }

    #[test]
    fn plan_render_uses_logical_size() {
        let mut state = loaded(400, 300);
        state.resize(800, 600).unwrap();
        state.rotate(180).unwrap();
        let params = plan_render(&state).unwrap();
        assert_eq!((params.canvas_width, params.canvas_height), (800, 600));
        assert_eq!(params.source.natural(), Dimensions::new(400, 300));
    }

    #[test]
    fn plan_render_blur_uses_export_scale() {
        let mut state = loaded(10, 10);
        state.apply_filter(Filter::Blur).unwrap();
        state.set_filter_intensity(30).unwrap();
        let pass = plan_render(&state).unwrap().filter.unwrap();
        assert_eq!(pass.to_css(), "blur(3px)");
    }

    #[test]
    fn export_renders_and_names_output() {
        let backend = MockBackend::new();
        let mut state = loaded(400, 300);
        state.rotate(90).unwrap();
        state.apply_filter(Filter::Sepia).unwrap();
        state.set_filter_intensity(80).unwrap();

        let exported = export(&backend, &state, "edited-").unwrap().unwrap();
        assert_eq!(exported.filename, "edited-photo.jpg");
        assert_eq!((exported.width, exported.height), (300, 400));
        assert_eq!(exported.bytes, b"rendered");

        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![RecordedOp::Render {
                width: 400,
                height: 300,
                canvas_width: 300,
                canvas_height: 400,
                rotation: 90,
                flip_horizontal: false,
                flip_vertical: false,
                filter: Some("sepia(0.8)".to_string()),
            }]
        );
    }

    #[test]
    fn export_empty_document_does_nothing() {
        let backend = MockBackend::new();
        assert!(export(&backend, &EditState::new(), "edited-").unwrap().is_none());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn export_propagates_render_failure() {
        let backend = MockBackend::new();
        *backend.fail_render.lock().unwrap() = true;
        assert!(export(&backend, &loaded(5, 5), "edited-").is_err());
    }

    #[test]
    fn prepare_upload_defaults_to_1024_jpeg_80() {
        let backend = MockBackend::new();
        let image = ImageRef::new(vec![0], ImageFormat::Png, Dimensions::new(4000, 3000));
        let bytes = prepare_upload(&backend, &image, UploadPrep::default()).unwrap();
        assert_eq!(bytes, b"downscaled");
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Downscale {
                max_width: 1024,
                max_height: 1024,
                quality: 80,
            }]
        );
    }

    #[test]
    fn decode_checked_rejects_empty_images() {
        let backend = MockBackend::with_dimensions(vec![Dimensions::new(0, 10)]);
        assert!(decode_checked(&backend, vec![1]).is_err());
    }

    #[test]
    fn decode_checked_passes_through() {
        let backend = MockBackend::with_dimensions(vec![Dimensions::new(3, 4)]);
        let image = decode_checked(&backend, vec![9, 9]).unwrap();
        assert_eq!(image.natural(), Dimensions::new(3, 4));
        assert_eq!(image.bytes(), &[9, 9]);
    }
}
