use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;

use crate::error::{excerpt, DrawError, Result};
use crate::types::{ImageLocation, PollObservation};

/// Fields that may carry a downloadable image URL, highest priority first.
pub const URL_KEYS: &[&str] = &["image_url", "url", "image"];

/// Fields that may carry inline base64 image data, highest priority first.
pub const INLINE_KEYS: &[&str] = &["image_data", "data"];

/// Return the first non-empty string found under `keys`.
pub(crate) fn first_string<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
}

/// Resolve a completed observation into an [`ImageLocation`].
///
/// URL fields win over inline fields. A response with neither, or with an
/// inline payload that is not valid base64, is an
/// [`DrawError::ExtractionFailed`].
pub fn extract(observation: &PollObservation) -> Result<ImageLocation> {
    let raw = &observation.raw;

    if let Some(url) = first_string(raw, URL_KEYS) {
        return Ok(ImageLocation::RemoteUrl(url.to_string()));
    }

    if let Some(data) = first_string(raw, INLINE_KEYS) {
        let bytes = decode_inline(data).ok_or_else(|| DrawError::ExtractionFailed {
            body: excerpt(&raw.to_string()),
        })?;
        return Ok(ImageLocation::InlineEncoded(bytes));
    }

    Err(DrawError::ExtractionFailed {
        body: excerpt(&raw.to_string()),
    })
}

/// Decode an inline payload, stripping a `data:image/...;base64,` header.
///
/// Whitespace anywhere in the payload is ignored, so line-wrapped base64
/// decodes the same as the unwrapped form.
pub fn decode_inline(data: &str) -> Option<Vec<u8>> {
    let payload = match data.strip_prefix("data:image") {
        Some(rest) => rest.split_once(',')?.1,
        None => data,
    };
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    BASE64.decode(compact).ok()
}
