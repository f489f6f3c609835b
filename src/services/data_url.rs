//! `data:` URLs, the way images travel inside JSON payloads.

use super::ServiceError;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// Encode bytes as `data:<media_type>;base64,<payload>`.
pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", BASE64.encode(bytes))
}

pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Decode a base64 `data:` URL into its media type and bytes.
pub fn decode(url: &str) -> Result<(String, Vec<u8>), ServiceError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ServiceError::Malformed("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ServiceError::Malformed("data URL has no payload".to_string()))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| ServiceError::Malformed("data URL is not base64".to_string()))?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| ServiceError::Malformed(format!("bad base64 in data URL: {e}")))?;
    Ok((media_type.to_string(), bytes))
}
