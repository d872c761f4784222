//! JSON-readiness check used to decide whether a retry is warranted.

use serde::de::IgnoredAny;

/// True when the body is fit to hand back to the caller.
///
/// Bodies not declared `application/json` are always ready. Declared JSON
/// must be valid UTF-8 and parse as a JSON document.
pub fn is_ready(content_type: &str, body: &[u8]) -> bool {
    if !declares_json(content_type) {
        return true;
    }

    std::str::from_utf8(body)
        .ok()
        .and_then(|text| serde_json::from_str::<IgnoredAny>(text).ok())
        .is_some()
}

pub fn declares_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}
