//! Editing session: one document, one backend, one config.
//!
//! [`Editor`] is the only thing that mutates an [`EditState`]. Every user
//! action goes through it, and it follows the same order each time:
//!
//! 1. Validate the input (media type, size cap, prompt, mask size).
//! 2. Run the fallible step (decode, network call) without touching state.
//! 3. Apply one synchronous document mutator.
//! 4. Report the outcome as an [`EditorEvent`].
//!
//! Any failure in steps 1-2 leaves the document exactly as it was. Errors are
//! both returned and sent as [`EditorEvent::Failed`], whose text is the
//! user-facing message.
//!
//! ## Events
//!
//! Events go to an optional `mpsc::Sender`, so a host can print them on
//! another thread while the session works:
//!
//! ```text
//! Notice("Image uploaded successfully")
//! Progress("Removing background...")
//! Notice("Background removed successfully")
//! Exported { filename: "edited-photo.jpg", width: 300, height: 400 }
//! Failed("No image to download")
//! ```

use crate::config::EditorConfig;
use crate::document::{DocumentError, EditState};
use crate::imaging::{
    BackendError, Dimensions, ExportedImage, Filter, ImageBackend, ImageRef, Mask, RustBackend,
    calculations::fit_within, media_type_for_path, operations,
};
use crate::preview::{PreviewStyle, preview_style};
use crate::services::{ApiKey, BackgroundRemover, Click, Inpainter, MaskPredictor, ServiceError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// Human size for limit messages: `10MB`, `512KB`, `300 bytes`.
fn format_limit(bytes: &u64) -> String {
    let bytes = *bytes;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}KB", bytes / 1024)
    } else {
        format!("{bytes} bytes")
    }
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("{0}")]
    Document(#[from] DocumentError),
    #[error("Please upload an image file")]
    NotAnImage { media_type: String },
    #[error("File size should be less than {}", format_limit(.limit))]
    TooLarge { len: u64, limit: u64 },
    #[error("Failed to read the image")]
    Unreadable(#[source] BackendError),
    #[error("Failed to load the processed image")]
    ProcessedUnreadable(#[source] BackendError),
    #[error("No image to download")]
    NothingToExport,
    #[error("Error downloading image: {0}")]
    Export(#[source] BackendError),
    #[error("Image processing failed: {0}")]
    Processing(#[from] BackendError),
    #[error("{0}")]
    Service(#[from] ServiceError),
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Mask is {mask} but the image is {image}")]
    MaskMismatch { mask: Dimensions, image: Dimensions },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// User-facing notification from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// An action succeeded.
    Notice(String),
    /// A long-running action started.
    Progress(String),
    /// An action failed; the document is unchanged.
    Failed(String),
    /// The composite was rendered and is ready to save.
    Exported {
        filename: String,
        width: u32,
        height: u32,
    },
}

/// A file offered by the user, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// MIME type as reported by the picker / file extension.
    pub media_type: String,
    /// Size the picker reported, checked before the bytes are looked at.
    pub declared_len: u64,
    pub filename: String,
}

impl Upload {
    /// Read a file from disk, guessing the media type from its extension.
    ///
    /// Files over `max_bytes` are not read: the upload carries only the
    /// declared length, which the editor then rejects.
    pub fn from_path(path: &Path, max_bytes: u64) -> std::io::Result<Self> {
        let declared_len = fs::metadata(path)?.len();
        let bytes = if declared_len > max_bytes {
            Vec::new()
        } else {
            fs::read(path)?
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            bytes,
            media_type: media_type_for_path(path).to_string(),
            declared_len,
            filename,
        })
    }
}

/// One editing session.
pub struct Editor<B: ImageBackend = RustBackend> {
    document: EditState,
    backend: B,
    config: EditorConfig,
    events: Option<Sender<EditorEvent>>,
}

impl Editor<RustBackend> {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_backend(RustBackend::new(), config)
    }
}

impl<B: ImageBackend> Editor<B> {
    pub fn with_backend(backend: B, config: EditorConfig) -> Self {
        Self {
            document: EditState::new(),
            backend,
            config,
            events: None,
        }
    }

    /// Send notifications to `tx` from now on.
    pub fn with_events(mut self, tx: Sender<EditorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn document(&self) -> &EditState {
        &self.document
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn notify(&self, event: EditorEvent) {
        tracing::debug!(?event, "editor event");
        if let Some(tx) = &self.events {
            // A host that stopped listening is not an editing error
            let _ = tx.send(event);
        }
    }

    fn notice(&self, message: &str) {
        self.notify(EditorEvent::Notice(message.to_string()));
    }

    fn report<T>(&self, result: Result<T, EditorError>) -> Result<T, EditorError> {
        if let Err(err) = &result {
            tracing::warn!(error = %err, "action failed");
            self.notify(EditorEvent::Failed(err.to_string()));
        }
        result
    }

    fn current_image(&self) -> Result<ImageRef, EditorError> {
        self.document
            .current()
            .cloned()
            .ok_or(EditorError::Document(DocumentError::Empty))
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Validate and decode an upload, then make it the document.
    pub fn upload(&mut self, upload: Upload) -> Result<(), EditorError> {
        let result = self.try_upload(upload);
        self.report(result)?;
        self.notice("Image uploaded successfully");
        Ok(())
    }

    fn try_upload(&mut self, upload: Upload) -> Result<(), EditorError> {
        if !upload.media_type.starts_with("image/") {
            return Err(EditorError::NotAnImage {
                media_type: upload.media_type,
            });
        }
        let limit = self.config.upload.max_bytes;
        let len = upload.declared_len.max(upload.bytes.len() as u64);
        if len > limit {
            return Err(EditorError::TooLarge { len, limit });
        }
        let image = operations::decode_checked(&self.backend, upload.bytes)
            .map_err(EditorError::Unreadable)?;
        tracing::info!(name = %upload.filename, size = %image.natural(), "image loaded");
        self.document.set_image(image, &upload.filename)?;
        Ok(())
    }

    /// Load an image that is already decoded. Without a name it is called
    /// `image.png`.
    pub fn load_image(&mut self, image: ImageRef, name: Option<&str>) -> Result<(), EditorError> {
        let result = self
            .document
            .set_image(image, name.unwrap_or_default())
            .map_err(EditorError::from);
        self.report(result)?;
        self.notice("Image uploaded successfully");
        Ok(())
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Set the logical size exactly.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EditorError> {
        let result = self.document.resize(width, height).map_err(EditorError::from);
        self.report(result)?;
        self.notice("Image resized successfully");
        Ok(())
    }

    /// Set the width, deriving the height from the aspect ratio.
    pub fn resize_to_width(&mut self, width: u32) -> Result<(), EditorError> {
        let result = self.document.resize_to_width(width).map_err(EditorError::from);
        self.report(result)?;
        self.notice("Image resized successfully");
        Ok(())
    }

    /// Set the height, deriving the width from the aspect ratio.
    pub fn resize_to_height(&mut self, height: u32) -> Result<(), EditorError> {
        let result = self.document.resize_to_height(height).map_err(EditorError::from);
        self.report(result)?;
        self.notice("Image resized successfully");
        Ok(())
    }

    pub fn rotate(&mut self, delta: i32) -> Result<(), EditorError> {
        let result = self.document.rotate(delta).map_err(EditorError::from);
        self.report(result)
    }

    pub fn rotate_left(&mut self) -> Result<(), EditorError> {
        self.rotate(-90)
    }

    pub fn rotate_right(&mut self) -> Result<(), EditorError> {
        self.rotate(90)
    }

    pub fn flip_horizontal(&mut self) -> Result<(), EditorError> {
        let result = self.document.flip_horizontal().map_err(EditorError::from);
        self.report(result)
    }

    pub fn flip_vertical(&mut self) -> Result<(), EditorError> {
        let result = self.document.flip_vertical().map_err(EditorError::from);
        self.report(result)
    }

    pub fn apply_filter(&mut self, filter: Filter) -> Result<(), EditorError> {
        let result = self.document.apply_filter(filter).map_err(EditorError::from);
        self.report(result)
    }

    pub fn set_filter_intensity(&mut self, percent: i32) -> Result<(), EditorError> {
        let result = self
            .document
            .set_filter_intensity(percent)
            .map_err(EditorError::from);
        self.report(result)
    }

    /// Go back to the uploaded image. The original is decoded again first;
    /// if that fails the document is left as it was.
    pub fn reset_to_original(&mut self) -> Result<(), EditorError> {
        let result = self.try_reset();
        self.report(result)?;
        self.notice("Image reset to original");
        Ok(())
    }

    fn try_reset(&mut self) -> Result<(), EditorError> {
        if self.document.is_empty() {
            return Err(DocumentError::Empty.into());
        }
        let original = self.document.original().ok_or(DocumentError::NoOriginal)?;
        operations::decode_checked(&self.backend, original.bytes().to_vec())
            .map_err(EditorError::Unreadable)?;
        self.document.reset_to_original()?;
        Ok(())
    }

    /// Drop the document entirely.
    pub fn clear(&mut self) {
        self.document.clear();
        self.notice("Canvas cleared successfully");
    }

    // =========================================================================
    // Preview and export
    // =========================================================================

    /// CSS description of the live preview, `None` when empty.
    pub fn preview(&self) -> Option<PreviewStyle> {
        preview_style(&self.document, self.config.preview.blur_scale)
    }

    /// Composite the document into a PNG.
    pub fn export(&self) -> Result<ExportedImage, EditorError> {
        let result = operations::export(
            &self.backend,
            &self.document,
            &self.config.export.filename_prefix,
        )
        .map_err(EditorError::Export)
        .and_then(|exported| exported.ok_or(EditorError::NothingToExport));
        let exported = self.report(result)?;
        self.notify(EditorEvent::Exported {
            filename: exported.filename.clone(),
            width: exported.width,
            height: exported.height,
        });
        Ok(exported)
    }

    /// Export and write the PNG into `dir`, returning the written path.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, EditorError> {
        let exported = self.export()?;
        let path = dir.join(&exported.filename);
        let result = fs::create_dir_all(dir)
            .and_then(|_| fs::write(&path, &exported.bytes))
            .map_err(EditorError::from);
        self.report(result)?;
        self.notice("Image downloaded successfully");
        Ok(path)
    }

    // =========================================================================
    // AI collaborators
    // =========================================================================

    /// Replace the current image with a background-free version.
    pub fn remove_background(
        &mut self,
        remover: &dyn BackgroundRemover,
        key: &ApiKey,
    ) -> Result<(), EditorError> {
        let result = self.try_remove_background(remover, key);
        self.report(result)?;
        self.notice("Background removed successfully");
        Ok(())
    }

    fn try_remove_background(
        &mut self,
        remover: &dyn BackgroundRemover,
        key: &ApiKey,
    ) -> Result<(), EditorError> {
        let current = self.current_image()?;
        self.notify(EditorEvent::Progress("Removing background...".to_string()));
        let bytes = remover.remove_background(&current, key)?;
        let replacement = operations::decode_checked(&self.backend, bytes)
            .map_err(EditorError::ProcessedUnreadable)?;
        self.document.replace_image(replacement)?;
        Ok(())
    }

    /// Regenerate the masked region from `prompt`.
    ///
    /// `mask` must match the current image's natural size. The image is shrunk
    /// for upload and the mask is scaled to match it.
    pub fn fill_masked(
        &mut self,
        inpainter: &dyn Inpainter,
        mask: &Mask,
        prompt: &str,
        key: &ApiKey,
    ) -> Result<(), EditorError> {
        let result = self.try_fill_masked(inpainter, mask, prompt, key);
        self.report(result)?;
        self.notice("Magic!");
        Ok(())
    }

    fn try_fill_masked(
        &mut self,
        inpainter: &dyn Inpainter,
        mask: &Mask,
        prompt: &str,
        key: &ApiKey,
    ) -> Result<(), EditorError> {
        let current = self.current_image()?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(EditorError::EmptyPrompt);
        }
        check_mask(mask, &current)?;

        let prep = self.config.services.inpaint.upload_prep();
        let (width, height) = fit_within(
            current.natural().as_tuple(),
            (prep.max_width, prep.max_height),
        );
        let upload_mask = mask.scaled_to(Dimensions::new(width, height));
        let upload = operations::prepare_upload(&self.backend, &current, prep)?;

        self.notify(EditorEvent::Progress("Magic is happening...".to_string()));
        let bytes = inpainter.fill_masked(&upload, &upload_mask, prompt, key)?;
        let replacement = operations::decode_checked(&self.backend, bytes)
            .map_err(EditorError::ProcessedUnreadable)?;
        self.document.replace_image(replacement)?;
        Ok(())
    }

    /// Ask a segmentation model for a mask over the current image.
    pub fn predict_mask(
        &self,
        predictor: &dyn MaskPredictor,
        clicks: &[Click],
    ) -> Result<Mask, EditorError> {
        let result = self.current_image().and_then(|current| {
            let mask = predictor.predict_mask(clicks, &current)?;
            check_mask(&mask, &current)?;
            Ok(mask)
        });
        self.report(result)
    }

    /// PNG of the current image with `mask` tinted over it.
    pub fn mask_overlay(&self, mask: &Mask) -> Result<Vec<u8>, EditorError> {
        let result = self.current_image().and_then(|current| {
            check_mask(mask, &current)?;
            Ok(self.backend.overlay_mask(&current, mask)?)
        });
        self.report(result)
    }
}

fn check_mask(mask: &Mask, image: &ImageRef) -> Result<(), EditorError> {
    if mask.dimensions() != image.natural() {
        return Err(EditorError::MaskMismatch {
            mask: mask.dimensions(),
            image: image.natural(),
        });
    }
    Ok(())
}
