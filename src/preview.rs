//! Live preview: a declarative description of how to show the document.
//!
//! The preview never touches pixels. It turns the edit document into the CSS
//! `transform` and `filter` values a display surface applies to the current
//! image, so it can be recomputed on every change for free. The export
//! composite in [`imaging::operations`](crate::imaging::operations) uses the
//! same rotation, flip and filter formulas; only the blur radius per unit of
//! intensity (`blur_scale`) may differ.
//!
//! ```text
//! transform: rotate(90deg) scale(-1, 1)
//! filter:    sepia(0.8)
//! ```

use crate::document::EditState;
use crate::imaging::{Dimensions, css_number, filter_pass};

/// CSS-style rendering instructions for the current document.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewStyle {
    /// Logical display size before the transform.
    pub size: Dimensions,
    pub transform: String,
    /// `None` when no filter is selected.
    pub filter: Option<String>,
}

impl PreviewStyle {
    /// Inline style declaration, e.g. `transform: rotate(0deg) scale(1, 1);`.
    pub fn to_css(&self) -> String {
        match &self.filter {
            Some(filter) => format!("transform: {}; filter: {};", self.transform, filter),
            None => format!("transform: {};", self.transform),
        }
    }
}

/// Describe how to display `state`. `None` for an empty document.
pub fn preview_style(state: &EditState, blur_scale: f64) -> Option<PreviewStyle> {
    if state.is_empty() {
        return None;
    }
    let sx = if state.is_flipped_horizontal() { -1 } else { 1 };
    let sy = if state.is_flipped_vertical() { -1 } else { 1 };
    let transform = format!(
        "rotate({}deg) scale({sx}, {sy})",
        css_number(f64::from(state.rotation()))
    );
    let filter = filter_pass(state.filter(), state.filter_intensity(), blur_scale)
        .map(|pass| pass.to_css());
    Some(PreviewStyle {
        size: state.dimensions(),
        transform,
        filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::calculations::{EXPORT_BLUR_SCALE, LEGACY_PREVIEW_BLUR_SCALE};
    use crate::imaging::{Filter, ImageRef};
    use image::ImageFormat;

    fn loaded() -> EditState {
        let mut state = EditState::new();
        state
            .set_image(
                ImageRef::new(vec![0], ImageFormat::Png, Dimensions::new(400, 300)),
                "photo.png",
            )
            .unwrap();
        state
    }

    #[test]
    fn empty_document_has_no_preview() {
        assert!(preview_style(&EditState::new(), EXPORT_BLUR_SCALE).is_none());
    }

    #[test]
    fn untouched_document_is_identity() {
        let style = preview_style(&loaded(), EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(style.transform, "rotate(0deg) scale(1, 1)");
        assert_eq!(style.filter, None);
        assert_eq!(style.size, Dimensions::new(400, 300));
        assert_eq!(style.to_css(), "transform: rotate(0deg) scale(1, 1);");
    }

    #[test]
    fn rotation_and_flip() {
        let mut state = loaded();
        state.rotate(90).unwrap();
        state.flip_horizontal().unwrap();
        let style = preview_style(&state, EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(style.transform, "rotate(90deg) scale(-1, 1)");

        state.flip_vertical().unwrap();
        let style = preview_style(&state, EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(style.transform, "rotate(90deg) scale(-1, -1)");
    }

    #[test]
    fn filter_matches_export_formula() {
        let mut state = loaded();
        state.apply_filter(Filter::Sepia).unwrap();
        state.set_filter_intensity(80).unwrap();
        let style = preview_style(&state, EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(style.filter.as_deref(), Some("sepia(0.8)"));
        assert_eq!(
            style.to_css(),
            "transform: rotate(0deg) scale(1, 1); filter: sepia(0.8);"
        );
    }

    #[test]
    fn brightness_range() {
        let mut state = loaded();
        state.apply_filter(Filter::Brightness).unwrap();
        state.set_filter_intensity(0).unwrap();
        let style = preview_style(&state, EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(style.filter.as_deref(), Some("brightness(0.5)"));
    }

    #[test]
    fn blur_scale_is_configurable() {
        let mut state = loaded();
        state.apply_filter(Filter::Blur).unwrap();
        state.set_filter_intensity(40).unwrap();

        let parity = preview_style(&state, EXPORT_BLUR_SCALE).unwrap();
        assert_eq!(parity.filter.as_deref(), Some("blur(4px)"));

        let legacy = preview_style(&state, LEGACY_PREVIEW_BLUR_SCALE).unwrap();
        assert_eq!(legacy.filter.as_deref(), Some("blur(2px)"));
    }
}
