//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Events
//!
//! Session events print one line each, prefixed by their kind:
//!
//! ```text
//! ✓ Image uploaded successfully
//! … Removing background...
//! ✗ Insufficient credits
//! → edited-photo.jpg (300 x 400 px)
//! ```
//!
//! ## Document summary
//!
//! ```text
//! File: photo.jpg
//!     Dimensions: 400 x 300 px
//!     Canvas: 300 x 400 px
//!     Rotation: 90°
//!     Flip: horizontal
//!     Filter: Sepia (80%)
//! ```
//!
//! ## Preview
//!
//! ```text
//! Preview
//!     transform: rotate(90deg) scale(-1, 1)
//!     filter: sepia(0.8)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability.
//! Events and capabilities also have a `print_*` wrapper that writes to stdout.
//! The document summary and preview are returned as lines so the CLI can print
//! them after the event stream has drained. Format functions are pure: no I/O,
//! no side effects.

use crate::document::EditState;
use crate::editor::EditorEvent;
use crate::imaging::{Filter, supported_media_types};
use crate::preview::PreviewStyle;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Events
// ============================================================================

pub fn format_event(event: &EditorEvent) -> Vec<String> {
    let line = match event {
        EditorEvent::Notice(msg) => format!("✓ {msg}"),
        EditorEvent::Progress(msg) => format!("… {msg}"),
        EditorEvent::Failed(msg) => format!("✗ {msg}"),
        EditorEvent::Exported {
            filename,
            width,
            height,
        } => format!("→ {filename} ({width} x {height} px)"),
    };
    vec![line]
}

pub fn print_event(event: &EditorEvent) {
    for line in format_event(event) {
        println!("{line}");
    }
}

// ============================================================================
// Document summary
// ============================================================================

pub fn format_document(state: &EditState) -> Vec<String> {
    if state.is_empty() {
        return vec!["No image loaded".to_string()];
    }
    let mut lines = vec![format!("File: {}", state.name())];
    lines.push(format!("{}Dimensions: {} px", indent(1), state.dimensions()));
    if state.rotation() % 180 != 0 {
        lines.push(format!("{}Canvas: {} px", indent(1), state.canvas_dimensions()));
    }
    if state.rotation() != 0 {
        lines.push(format!("{}Rotation: {}°", indent(1), state.rotation()));
    }
    let flips: Vec<&str> = [
        (state.is_flipped_horizontal(), "horizontal"),
        (state.is_flipped_vertical(), "vertical"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if !flips.is_empty() {
        lines.push(format!("{}Flip: {}", indent(1), flips.join(", ")));
    }
    if state.filter() != Filter::None {
        let (label, _) = state.filter().label();
        lines.push(format!(
            "{}Filter: {} ({}%)",
            indent(1),
            label,
            state.filter_intensity().value()
        ));
    }
    lines
}

// ============================================================================
// Preview
// ============================================================================

pub fn format_preview(style: &PreviewStyle) -> Vec<String> {
    let mut lines = vec![
        "Preview".to_string(),
        format!("{}transform: {}", indent(1), style.transform),
    ];
    if let Some(filter) = &style.filter {
        lines.push(format!("{}filter: {}", indent(1), filter));
    }
    lines
}

// ============================================================================
// Capabilities
// ============================================================================

/// Filters and decodable formats.
pub fn format_capabilities() -> Vec<String> {
    let mut lines = vec!["Filters".to_string()];
    for filter in Filter::ALL {
        let (label, description) = filter.label();
        lines.push(format!("{}{:<11} {} ({})", indent(1), filter.name(), label, description));
    }
    lines.push("Formats".to_string());
    lines.push(format!("{}{}", indent(1), supported_media_types().join(", ")));
    lines
}

pub fn print_capabilities() {
    for line in format_capabilities() {
        println!("{line}");
    }
}
