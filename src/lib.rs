//! # Retouch
//!
//! A single-document image editor core. One image is loaded at a time, and
//! edits are recorded as parameters (size, rotation, flips, filter) instead of
//! being baked into pixels. Pixels are only produced when the document is
//! exported, by compositing the original onto a fresh canvas.
//!
//! # Architecture: State, Engine, Collaborators
//!
//! ```text
//! Upload ──► Editor ──► EditState (parameters only)
//!              │             │
//!              │             ├──► preview   (CSS transform + filter, no pixels)
//!              │             └──► export    (ImageBackend::render → PNG)
//!              │
//!              └──► remove.bg / fal.ai / mask predictor (replace the pixels)
//! ```
//!
//! - **Edits are cheap.** Rotating or filtering only changes a few fields;
//!   the preview is recomputed from them without touching the image.
//! - **Export is deterministic.** The same document always renders the same
//!   canvas: base draw with rotation and flips, then an optional filter pass
//!   composited on top.
//! - **Collaborators replace, never edit.** A background removal or inpaint
//!   produces a new image; size follows it, while rotation, flips and filter
//!   are kept.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`document`] | `EditState`: the document and its synchronous mutators |
//! | [`editor`] | `Editor`: validates input, calls collaborators, emits events |
//! | [`imaging`] | Transform engine: canvas math, filters, PNG export, masks |
//! | [`preview`] | CSS description of the live preview |
//! | [`services`] | remove.bg and fal.ai clients behind small traits |
//! | [`config`] | `retouch.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Parameters Over Pixels
//!
//! The document stores the original image plus the transform to apply. The
//! current image is only ever replaced by an AI collaborator, so reset can
//! always go back to exactly what was uploaded.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding and encoding and
//! does the canvas compositing itself, parallelised per row with `rayon`. No
//! system libraries are needed.
//!
//! ## Blocking Collaborators
//!
//! The remote services are called with blocking `ureq` requests. A session
//! performs one action at a time, so there is nothing to overlap; hosts that
//! want a responsive UI run the session on a worker thread and listen to its
//! events.

pub mod config;
pub mod document;
pub mod editor;
pub mod imaging;
pub mod output;
pub mod preview;
pub mod services;

#[cfg(test)]
pub(crate) mod test_helpers;
