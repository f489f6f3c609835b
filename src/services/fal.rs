//! fal.ai inpainting client (`fal-ai/flux-lora-fill`).
//!
//! Calls the synchronous run endpoint, so one request blocks until the model
//! is done:
//!
//! ```text
//! POST https://fal.run/fal-ai/flux-lora-fill
//! Authorization: Key <key>
//! {"prompt": "...", "image_url": "data:image/jpeg;base64,...", "mask_url": "data:image/png;base64,..."}
//! ```
//!
//! The response lists generated images; the first one is downloaded (or
//! decoded in place when the service inlines it as a data URL).

use super::{ApiKey, Inpainter, MAX_RESPONSE_BYTES, ServiceError, data_url, http_agent};
use crate::imaging::Mask;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://fal.run/fal-ai/flux-lora-fill";
const FALLBACK_MESSAGE: &str = "Failed to process image";

#[derive(Debug, Serialize)]
struct FillRequest<'a> {
    prompt: &'a str,
    image_url: String,
    mask_url: String,
}

#[derive(Debug, Deserialize)]
struct FillResponse {
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    detail: serde_json::Value,
}

/// URL of the first generated image.
fn first_image_url(body: &[u8]) -> Result<String, ServiceError> {
    let response: FillResponse =
        serde_json::from_slice(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    response
        .images
        .into_iter()
        .next()
        .map(|image| image.url)
        .ok_or(ServiceError::NoImages)
}

/// User-facing message for a failed response body.
///
/// `detail` is either a plain string or a list of validation errors with
/// `msg` fields.
fn error_message(body: &[u8]) -> String {
    let Ok(payload) = serde_json::from_slice::<ErrorPayload>(body) else {
        return FALLBACK_MESSAGE.to_string();
    };
    match payload.detail {
        serde_json::Value::String(s) if !s.is_empty() => s,
        serde_json::Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

pub struct FalInpainter {
    agent: ureq::Agent,
    endpoint: String,
}

impl FalInpainter {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            agent: http_agent(timeout),
            endpoint: endpoint.into(),
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        if data_url::is_data_url(url) {
            let (_, bytes) = data_url::decode(url)?;
            return Ok(bytes);
        }
        tracing::debug!(%url, "downloading generated image");
        let mut response = self.agent.get(url).call()?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ServiceError::Status {
                status,
                message: "Failed to load the processed image".to_string(),
            });
        }
        Ok(response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()?)
    }
}

impl Default for FalInpainter {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, None)
    }
}

impl Inpainter for FalInpainter {
    fn fill_masked(
        &self,
        image: &[u8],
        mask: &Mask,
        prompt: &str,
        key: &ApiKey,
    ) -> Result<Vec<u8>, ServiceError> {
        if key.is_empty() {
            return Err(ServiceError::MissingApiKey);
        }
        let mask_png = mask
            .to_png()
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let body = FillRequest {
            prompt,
            image_url: data_url::encode("image/jpeg", image),
            mask_url: data_url::encode("image/png", &mask_png),
        };
        tracing::debug!(endpoint = %self.endpoint, "inpainting request");

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", &format!("Key {}", key.expose()))
            .send_json(&body)?;
        let status = response.status().as_u16();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()?;

        if !(200..300).contains(&status) {
            let message = error_message(&bytes);
            tracing::warn!(status, %message, "inpainting failed");
            return Err(ServiceError::Status { status, message });
        }
        let url = first_image_url(&bytes)?;
        self.fetch(&url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_image_is_used() {
        let body = br#"{"images":[{"url":"https://fal.media/a.png","width":1024},{"url":"https://fal.media/b.png"}],"seed":7}"#;
        assert_eq!(first_image_url(body).unwrap(), "https://fal.media/a.png");
    }

    #[test]
    fn empty_result_is_an_error() {
        let err = first_image_url(br#"{"images":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "No images returned from the API");
        assert!(matches!(
            first_image_url(br#"{"seed":1}"#),
            Err(ServiceError::NoImages)
        ));
    }

    #[test]
    fn garbage_response_is_malformed() {
        assert!(matches!(
            first_image_url(b"not json"),
            Err(ServiceError::Malformed(_))
        ));
    }

    #[test]
    fn error_detail_string() {
        assert_eq!(error_message(br#"{"detail":"Unauthorized"}"#), "Unauthorized");
    }

    #[test]
    fn error_detail_validation_list() {
        let body = br#"{"detail":[{"loc":["body","prompt"],"msg":"field required","type":"missing"}]}"#;
        assert_eq!(error_message(body), "field required");
    }

    #[test]
    fn error_without_detail_falls_back() {
        assert_eq!(error_message(b"{}"), FALLBACK_MESSAGE);
        assert_eq!(error_message(b"oops"), FALLBACK_MESSAGE);
    }

    #[test]
    fn request_uses_data_urls() {
        let body = FillRequest {
            prompt: "a red balloon",
            image_url: data_url::encode("image/jpeg", b"jpg"),
            mask_url: data_url::encode("image/png", b"png"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["prompt"], "a red balloon");
        assert!(json["image_url"].as_str().unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(json["mask_url"].as_str().unwrap().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn inline_result_is_decoded_without_a_request() {
        let client = FalInpainter::new("http://127.0.0.1:9/unused", None);
        let bytes = client.fetch("data:image/png;base64,aGk=").unwrap();
        assert_eq!(bytes, b"hi");
    }
}
