//! The edit document: one image under edit plus every pending transform.
//!
//! [`EditState`] is the single source of truth for a session. It holds two
//! images:
//!
//! - **original**: what was uploaded. Never changed after upload, so
//!   [`EditState::reset_to_original`] can always go back to it.
//! - **current**: the working image. AI collaborators replace it wholesale;
//!   rotation, flips and the filter survive the replacement, so their effects
//!   stack across edits.
//!
//! Transforms are not applied to pixels here. They are parameters that the
//! preview and the export composite read when they need them.
//!
//! ## State machine
//!
//! ```text
//!            set_image               resize / rotate / flip / filter / replace
//!   Empty ─────────────▶ Loaded ◀──────────────────────────────────────────┐
//!     ▲                    │  └─────────────────────────────────────────────┘
//!     │      clear         │  reset_to_original (back to upload defaults)
//!     └────────────────────┘
//! ```
//!
//! Every mutator other than `set_image` and `clear` refuses to run on an
//! empty document and leaves it untouched.

use crate::imaging::{Dimensions, Filter, ImageRef, Intensity, calculations};
use thiserror::Error;

/// Name given to images loaded without a filename.
pub const DEFAULT_IMAGE_NAME: &str = "image.png";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("No image to process")]
    Empty,
    #[error("No original image to restore")]
    NoOriginal,
    #[error("Invalid dimensions {width}x{height}: both must be greater than zero")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Edit document. Fields are private; read them through the accessors and
/// change them only through the mutators, which keep the invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditState {
    original: Option<ImageRef>,
    current: Option<ImageRef>,
    name: String,
    width: u32,
    height: u32,
    rotation: u16,
    flip_horizontal: bool,
    flip_vertical: bool,
    filter: Filter,
    filter_intensity: Intensity,
}

fn check_dimensions(dims: Dimensions) -> Result<(), DocumentError> {
    if dims.width == 0 || dims.height == 0 {
        return Err(DocumentError::InvalidDimensions {
            width: dims.width,
            height: dims.height,
        });
    }
    Ok(())
}

impl EditState {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn original(&self) -> Option<&ImageRef> {
        self.original.as_ref()
    }

    pub fn current(&self) -> Option<&ImageRef> {
        self.current.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical width (after resize, before rotation).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Logical height (after resize, before rotation).
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Rotation in degrees, always in `[0, 360)`.
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn is_flipped_horizontal(&self) -> bool {
        self.flip_horizontal
    }

    pub fn is_flipped_vertical(&self) -> bool {
        self.flip_vertical
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn filter_intensity(&self) -> Intensity {
        self.filter_intensity
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Size of the exported canvas: logical size with axes swapped for
    /// quarter turns.
    pub fn canvas_dimensions(&self) -> Dimensions {
        let (width, height) =
            calculations::canvas_dimensions((self.width, self.height), self.rotation);
        Dimensions::new(width, height)
    }

    /// Suggested download name, `<prefix><name>`.
    pub fn export_filename(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name)
    }

    fn require_image(&self) -> Result<(), DocumentError> {
        if self.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(())
    }

    /// Load a freshly decoded image, discarding all previous edits.
    ///
    /// An empty `name` falls back to [`DEFAULT_IMAGE_NAME`].
    pub fn set_image(&mut self, image: ImageRef, name: &str) -> Result<(), DocumentError> {
        let natural = image.natural();
        check_dimensions(natural)?;
        let name = if name.is_empty() {
            DEFAULT_IMAGE_NAME
        } else {
            name
        };
        *self = Self {
            original: Some(image.clone()),
            current: Some(image),
            name: name.to_string(),
            width: natural.width,
            height: natural.height,
            ..Self::default()
        };
        Ok(())
    }

    /// Set the logical size exactly as given.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), DocumentError> {
        self.require_image()?;
        check_dimensions(Dimensions::new(width, height))?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Set the width and derive the height from the current aspect ratio.
    pub fn resize_to_width(&mut self, width: u32) -> Result<(), DocumentError> {
        self.require_image()?;
        let height = calculations::height_for_width((self.width, self.height), width);
        self.resize(width, height)
    }

    /// Set the height and derive the width from the current aspect ratio.
    pub fn resize_to_height(&mut self, height: u32) -> Result<(), DocumentError> {
        self.require_image()?;
        let width = calculations::width_for_height((self.width, self.height), height);
        self.resize(width, height)
    }

    /// Add `delta` degrees (negative turns counter-clockwise).
    pub fn rotate(&mut self, delta: i32) -> Result<(), DocumentError> {
        self.require_image()?;
        self.rotation =
            calculations::normalize_rotation(i32::from(self.rotation) + delta.rem_euclid(360));
        Ok(())
    }

    pub fn flip_horizontal(&mut self) -> Result<(), DocumentError> {
        self.require_image()?;
        self.flip_horizontal = !self.flip_horizontal;
        Ok(())
    }

    pub fn flip_vertical(&mut self) -> Result<(), DocumentError> {
        self.require_image()?;
        self.flip_vertical = !self.flip_vertical;
        Ok(())
    }

    pub fn apply_filter(&mut self, filter: Filter) -> Result<(), DocumentError> {
        self.require_image()?;
        self.filter = filter;
        Ok(())
    }

    /// Set intensity in percent, clamped into `[0, 100]`.
    pub fn set_filter_intensity(&mut self, percent: i32) -> Result<(), DocumentError> {
        self.require_image()?;
        self.filter_intensity = Intensity::new(percent);
        Ok(())
    }

    /// Go back to the uploaded image with upload defaults. Keeps the name.
    pub fn reset_to_original(&mut self) -> Result<(), DocumentError> {
        self.require_image()?;
        let original = self.original.clone().ok_or(DocumentError::NoOriginal)?;
        let natural = original.natural();
        let name = std::mem::take(&mut self.name);
        *self = Self {
            original: Some(original.clone()),
            current: Some(original),
            name,
            width: natural.width,
            height: natural.height,
            ..Self::default()
        };
        Ok(())
    }

    /// Drop everything, original included.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Swap in a new working image from a collaborator.
    ///
    /// Logical size follows the new image; rotation, flips and filter stay.
    pub fn replace_image(&mut self, image: ImageRef) -> Result<(), DocumentError> {
        self.require_image()?;
        let natural = image.natural();
        check_dimensions(natural)?;
        self.width = natural.width;
        self.height = natural.height;
        self.current = Some(image);
        Ok(())
    }
}
