//! Pure calculation functions for transform geometry and filter parameters.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{Filter, FilterPass, Intensity};

/// Blur radius per unit of intensity on the export path.
pub const EXPORT_BLUR_SCALE: f64 = 10.0;

/// Blur radius per unit of intensity used by the historical cheap preview.
pub const LEGACY_PREVIEW_BLUR_SCALE: f64 = 5.0;

/// Normalize an accumulated rotation into `[0, 360)`.
///
/// # Examples
/// ```
/// # use retouch::imaging::normalize_rotation;
/// assert_eq!(normalize_rotation(450), 90);
/// assert_eq!(normalize_rotation(-90), 270);
/// ```
pub fn normalize_rotation(degrees: i32) -> u16 {
    degrees.rem_euclid(360) as u16
}

/// Output canvas size for a logical size drawn at `rotation`.
///
/// A quarter turn swaps the axes; half turns and identity keep them. This is
/// the bounding box of the rotated rectangle only for multiples of 90°.
///
/// # Examples
/// ```
/// # use retouch::imaging::canvas_dimensions;
/// assert_eq!(canvas_dimensions((200, 100), 90), (100, 200));
/// assert_eq!(canvas_dimensions((200, 100), 180), (200, 100));
/// ```
pub fn canvas_dimensions(logical: (u32, u32), rotation: u16) -> (u32, u32) {
    let (width, height) = logical;
    if rotation % 180 != 0 {
        (height, width)
    } else {
        (width, height)
    }
}

/// Exact `(cos, sin)` for a rotation in degrees.
///
/// Quarter turns return exact integers so pixel centres land on pixel
/// centres; other angles fall back to floating point trigonometry.
pub fn rotation_cos_sin(rotation: u16) -> (f64, f64) {
    match rotation % 360 {
        0 => (1.0, 0.0),
        90 => (0.0, 1.0),
        180 => (-1.0, 0.0),
        270 => (0.0, -1.0),
        other => {
            let radians = f64::from(other).to_radians();
            (radians.cos(), radians.sin())
        }
    }
}

/// Height that keeps the aspect ratio of `current` when the width changes.
///
/// Mirrors the resize dialog: `ratio = width / height`, new height is
/// `round(new_width / ratio)`.
pub fn height_for_width(current: (u32, u32), new_width: u32) -> u32 {
    let (w, h) = current;
    let ratio = f64::from(w) / f64::from(h);
    (f64::from(new_width) / ratio).round() as u32
}

/// Width that keeps the aspect ratio of `current` when the height changes.
pub fn width_for_height(current: (u32, u32), new_height: u32) -> u32 {
    let (w, h) = current;
    let ratio = f64::from(w) / f64::from(h);
    (f64::from(new_height) * ratio).round() as u32
}

/// Shrink `source` to fit inside `max`, preserving aspect ratio.
///
/// Width is constrained first, then height; sizes already inside the bounds
/// are returned unchanged. Never upscales.
pub fn fit_within(source: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (mut width, mut height) = source;
    let (max_w, max_h) = max;

    if width > max_w {
        height = (f64::from(height) * f64::from(max_w) / f64::from(width)).round() as u32;
        width = max_w;
    }
    if height > max_h {
        width = (f64::from(width) * f64::from(max_h) / f64::from(height)).round() as u32;
        height = max_h;
    }

    (width.max(1), height.max(1))
}

/// Compute the CSS parameter for `filter` at `intensity`.
///
/// `blur_scale` is the radius in pixels at full intensity
/// ([`EXPORT_BLUR_SCALE`] on export). Returns `None` for [`Filter::None`].
///
/// | filter | parameter |
/// |---|---|
/// | grayscale, sepia, invert | `i` |
/// | blur | `i × blur_scale` |
/// | brightness, contrast | `0.5 + i × 1.5` |
/// | saturate | `i × 2` |
pub fn filter_pass(filter: Filter, intensity: Intensity, blur_scale: f64) -> Option<FilterPass> {
    let i = intensity.fraction();
    let amount = match filter {
        Filter::None => return None,
        Filter::Grayscale | Filter::Sepia | Filter::Invert => i,
        Filter::Blur => i * blur_scale,
        Filter::Brightness | Filter::Contrast => 0.5 + i * 1.5,
        Filter::Saturate => i * 2.0,
    };
    Some(FilterPass { filter, amount })
}
