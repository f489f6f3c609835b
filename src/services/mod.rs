//! External collaborators: background removal, inpainting and segmentation.
//!
//! The editor only knows these through three narrow traits. Each call is
//! blocking, gets the image it should work on, and returns replacement bytes
//! (or a mask) that the editor decodes before touching the document. A
//! failure is one [`ServiceError`] whose `Display` is the message to show the
//! user; nothing is retried.
//!
//! | Trait | Shipped implementation |
//! |---|---|
//! | [`BackgroundRemover`] | [`RemoveBgClient`] (remove.bg HTTP API) |
//! | [`Inpainter`] | [`FalInpainter`] (fal.ai `flux-lora-fill`) |
//! | [`MaskPredictor`] | none; segmentation models are plugged in by the host |

pub mod data_url;
pub mod fal;
pub mod remove_bg;

use crate::imaging::{ImageRef, Mask};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub use fal::FalInpainter;
pub use remove_bg::RemoveBgClient;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Please enter your API key")]
    MissingApiKey,
    #[error("{0}")]
    Transport(String),
    /// Non-success status. `message` comes from the service's error payload
    /// when it has one.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Malformed(String),
    #[error("No images returned from the API")]
    NoImages,
    #[error("{0}")]
    Model(String),
}

impl From<ureq::Error> for ServiceError {
    fn from(err: ureq::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

/// Credential for a paid service. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Whether a click adds to or carves out of the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Include,
    Exclude,
}

/// A point prompt for segmentation, in natural image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Click {
    pub x: f64,
    pub y: f64,
    pub kind: ClickKind,
}

impl Click {
    pub fn include(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            kind: ClickKind::Include,
        }
    }

    pub fn exclude(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            kind: ClickKind::Exclude,
        }
    }
}

/// Removes the background from an image, returning the new encoded image.
pub trait BackgroundRemover {
    fn remove_background(&self, image: &ImageRef, key: &ApiKey) -> Result<Vec<u8>, ServiceError>;
}

/// Regenerates the masked region of an image from a text prompt.
///
/// `image` has already been shrunk and re-encoded for upload.
pub trait Inpainter {
    fn fill_masked(
        &self,
        image: &[u8],
        mask: &Mask,
        prompt: &str,
        key: &ApiKey,
    ) -> Result<Vec<u8>, ServiceError>;
}

/// Predicts a selection mask from point prompts.
pub trait MaskPredictor {
    fn predict_mask(&self, clicks: &[Click], image: &ImageRef) -> Result<Mask, ServiceError>;
}

/// Blocking HTTP agent shared by the shipped clients.
///
/// Non-2xx responses come back as normal responses so the clients can read
/// the service's error payload.
pub(crate) fn http_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

/// Largest response body the clients will read.
pub(crate) const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;
