//! Response extraction and URL validation
//!
//! Shortening services either print the short URL as plain text or return
//! a JSON document. For JSON, a configured dot path is walked key by key;
//! without one, a fixed list of common field names is tried in order.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::ShortenError;
use crate::domain::ResponseFormat;

/// Field names tried, in order, when a JSON platform has no response path
pub const COMMON_URL_FIELDS: &[&str] = &["short_url", "shortUrl", "url", "link", "data"];

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^https?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?",
        r"|localhost",
        r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("static regex")
});

/// Returns true if `url` looks like an http(s) URL with a valid host
pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pulls the candidate short URL out of a service response
pub fn extract(output: &str, format: ResponseFormat, path: &str) -> Result<String, ShortenError> {
    match format {
        ResponseFormat::Text => Ok(output.trim().to_string()),
        ResponseFormat::Json => {
            let data: Value = serde_json::from_str(output.trim())
                .map_err(|e| ShortenError::InvalidJson(e.to_string()))?;

            let path = path.trim();
            if path.is_empty() {
                return extract_common_field(&data);
            }

            let mut current = &data;
            for key in path.split('.') {
                current = current
                    .as_object()
                    .and_then(|obj| obj.get(key))
                    .ok_or_else(|| ShortenError::PathNotFound(path.to_string()))?;
            }

            Ok(value_to_string(current).trim().to_string())
        }
    }
}

fn extract_common_field(data: &Value) -> Result<String, ShortenError> {
    if let Some(obj) = data.as_object() {
        for field in COMMON_URL_FIELDS {
            if let Some(value) = obj.get(*field) {
                return Ok(value_to_string(value).trim().to_string());
            }
        }
    }

    if let Value::String(s) = data {
        return Ok(s.trim().to_string());
    }

    Err(ShortenError::NoUrlField)
}
