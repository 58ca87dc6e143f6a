//! Locating and decoding JSON objects in model output.

use serde::de::DeserializeOwned;

use crate::error::SchemaError;

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    // Wrapped in markdown code block
    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return Some(&trimmed[start..=end]);
    }

    None
}

/// Locate the JSON object in `raw` and deserialize it.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, SchemaError> {
    let json = extract_json_object(raw).ok_or(SchemaError::NoJson)?;
    serde_json::from_str(json).map_err(|e| SchemaError::Malformed(e.to_string()))
}
