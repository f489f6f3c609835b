//! remove.bg background removal client.
//!
//! One blocking `POST` per call:
//!
//! ```text
//! POST https://api.remove.bg/v1.0/removebg
//! X-Api-Key: <key>
//! Accept: image/*
//! {"image_file_b64": "<base64>", "size": "auto"}
//! ```
//!
//! A success body is the cut-out image (PNG with alpha). Failures carry a
//! JSON payload whose first error title becomes the user-facing message.

use super::{ApiKey, BackgroundRemover, MAX_RESPONSE_BYTES, ServiceError, http_agent};
use crate::imaging::ImageRef;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";
const FALLBACK_MESSAGE: &str = "Failed to remove background";

#[derive(Debug, Serialize)]
struct RemoveBgRequest<'a> {
    image_file_b64: String,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    title: Option<String>,
}

/// User-facing message for a failed response body.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.errors.into_iter().next())
        .and_then(|entry| entry.title)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

pub struct RemoveBgClient {
    agent: ureq::Agent,
    endpoint: String,
    size: String,
}

impl RemoveBgClient {
    pub fn new(endpoint: impl Into<String>, size: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            agent: http_agent(timeout),
            endpoint: endpoint.into(),
            size: size.into(),
        }
    }
}

impl Default for RemoveBgClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, "auto", None)
    }
}

impl BackgroundRemover for RemoveBgClient {
    fn remove_background(&self, image: &ImageRef, key: &ApiKey) -> Result<Vec<u8>, ServiceError> {
        if key.is_empty() {
            return Err(ServiceError::MissingApiKey);
        }
        let body = RemoveBgRequest {
            image_file_b64: BASE64.encode(image.bytes()),
            size: &self.size,
        };
        tracing::debug!(endpoint = %self.endpoint, len = image.len(), "remove.bg request");

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("X-Api-Key", key.expose())
            .header("Accept", "image/*")
            .send_json(&body)?;
        let status = response.status().as_u16();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()?;

        if !(200..300).contains(&status) {
            let message = error_message(&bytes);
            tracing::warn!(status, %message, "remove.bg failed");
            return Err(ServiceError::Status { status, message });
        }
        Ok(bytes)
    }
}
