//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which turns an [`EditState`](crate::document::EditState) into a plan) and
//! the [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing planning logic.
//!
//! ## Types
//!
//! - [`Filter`]: The closed set of stylistic filters.
//! - [`Intensity`]: Filter strength in percent (0–100, default 100). Clamped on construction.
//! - [`FilterPass`]: A filter with its computed parameter, ready to draw.
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`RenderParams`]: Full specification for a composite: source, logical size, canvas, transform, filter.
//! - [`DownscaleParams`]: Fit-within-bounds re-encode used before uploading to a service.

use super::image_ref::ImageRef;
use std::fmt;
use std::str::FromStr;

/// Stylistic filter applied as an overlay pass on top of the base draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Blur,
    Brightness,
    Contrast,
    Saturate,
    Invert,
}

impl Filter {
    /// Every filter, in menu order.
    pub const ALL: [Filter; 8] = [
        Filter::None,
        Filter::Grayscale,
        Filter::Sepia,
        Filter::Blur,
        Filter::Brightness,
        Filter::Contrast,
        Filter::Saturate,
        Filter::Invert,
    ];

    /// Lowercase identifier, identical to the CSS filter function name.
    pub fn name(self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Grayscale => "grayscale",
            Filter::Sepia => "sepia",
            Filter::Blur => "blur",
            Filter::Brightness => "brightness",
            Filter::Contrast => "contrast",
            Filter::Saturate => "saturate",
            Filter::Invert => "invert",
        }
    }

    /// Human-facing label and one-line description.
    pub fn label(self) -> (&'static str, &'static str) {
        match self {
            Filter::None => ("None", "No filter"),
            Filter::Grayscale => ("Grayscale", "Black and white"),
            Filter::Sepia => ("Sepia", "Vintage look"),
            Filter::Blur => ("Blur", "Soft focus effect"),
            Filter::Brightness => ("Brightness", "Adjust lighting"),
            Filter::Contrast => ("Contrast", "Enhance details"),
            Filter::Saturate => ("Saturation", "Color intensity"),
            Filter::Invert => ("Invert", "Negative colors"),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        // "saturation" is what the filter menu calls it
        if wanted == "saturation" {
            return Ok(Filter::Saturate);
        }
        Filter::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Filter::ALL.iter().map(|f| f.name()).collect();
                format!("unknown filter '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Filter intensity in percent (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u8);

impl Intensity {
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Intensity as a unit fraction, `value / 100`.
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(100)
    }
}

/// A filter together with its computed CSS parameter.
///
/// `amount` is the value that goes inside the CSS function: a unit factor for
/// the colour filters, a pixel radius for blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPass {
    pub filter: Filter,
    pub amount: f64,
}

impl FilterPass {
    /// CSS filter function, e.g. `sepia(0.8)` or `blur(4px)`.
    pub fn to_css(self) -> String {
        let value = css_number(self.amount);
        match self.filter {
            Filter::Blur => format!("blur({value}px)"),
            other => format!("{}({value})", other.name()),
        }
    }
}

/// Format a number the way a browser serializes a CSS value: at most four
/// decimals, no trailing zeros.
pub(crate) fn css_number(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for compositing the document onto an output canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: ImageRef,
    /// Logical (post-resize, pre-rotation) draw size.
    pub width: u32,
    pub height: u32,
    /// Output canvas size, already swapped for quarter-turn rotations.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Degrees in `[0, 360)`.
    pub rotation: u16,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Overlay pass drawn over the base image, if any.
    pub filter: Option<FilterPass>,
}

/// Parameters for a fit-within-bounds JPEG re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct DownscaleParams {
    pub source: ImageRef,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
