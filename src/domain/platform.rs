//! Shortening platform model
//!
//! A platform describes an external URL-shortening service declaratively:
//! a command template with placeholders plus instructions for pulling the
//! short URL out of whatever the service prints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder replaced by the long URL
pub const LINK_PLACEHOLDER: &str = "${link_download}";

/// Placeholder replaced by the platform's API key
pub const API_KEY_PLACEHOLDER: &str = "${api_key}";

/// Icon assigned when a new platform does not name one
pub const DEFAULT_PLATFORM_ICON: &str = "fas fa-link";

#[derive(Debug, Error, PartialEq)]
pub enum PlatformError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Command template must contain ${{link_download}}")]
    MissingPlaceholder,

    #[error("Unsupported response format: {0} (expected text or json)")]
    UnsupportedFormat(String),

    #[error("Platform not found: {0}")]
    NotFound(u32),

    #[error("Platform {0} is inactive")]
    Inactive(u32),
}

/// How a platform's response is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// The trimmed output is the short URL
    #[default]
    Text,

    /// The output is a JSON document containing the short URL
    Json,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Text => write!(f, "text"),
            ResponseFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ResponseFormat::Text),
            "json" => Ok(ResponseFormat::Json),
            other => Err(PlatformError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn default_active() -> bool {
    true
}

/// A configured shortening service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    /// Stable identifier, assigned by the registry
    pub id: u32,

    pub name: String,

    #[serde(default)]
    pub logo_url: String,

    /// Service endpoint, informational only
    #[serde(default)]
    pub api_endpoint: String,

    /// Command template containing `${link_download}`
    pub curl_template: String,

    #[serde(default)]
    pub response_format: ResponseFormat,

    /// Dot separated key path into a JSON response
    #[serde(default)]
    pub response_path: String,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default)]
    pub icon: String,

    /// Substituted for `${api_key}` when the template references it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for Platform {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            logo_url: String::new(),
            api_endpoint: String::new(),
            curl_template: String::new(),
            response_format: ResponseFormat::Text,
            response_path: String::new(),
            active: true,
            icon: DEFAULT_PLATFORM_ICON.to_string(),
            api_key: None,
        }
    }
}

impl Platform {
    /// Returns true if the template needs an API key
    pub fn needs_api_key(&self) -> bool {
        self.curl_template.contains(API_KEY_PLACEHOLDER)
    }
}

/// Operator input for creating or replacing a platform
///
/// Every field is optional here so that validation can report exactly
/// which required one is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformDraft {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub api_endpoint: Option<String>,
    pub curl_template: Option<String>,
    pub response_format: Option<String>,
    pub response_path: Option<String>,
    pub active: Option<bool>,
    pub icon: Option<String>,
    pub api_key: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, PlatformError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PlatformError::MissingField(field)),
    }
}

impl PlatformDraft {
    /// Validates the draft and fills defaults, producing a platform with `id`
    pub fn into_platform(self, id: u32) -> Result<Platform, PlatformError> {
        let name = required(self.name, "name")?;
        let api_endpoint = required(self.api_endpoint, "api_endpoint")?;
        let curl_template = required(self.curl_template, "curl_template")?;
        let response_format: ResponseFormat =
            required(self.response_format, "response_format")?.parse()?;

        if !curl_template.contains(LINK_PLACEHOLDER) {
            return Err(PlatformError::MissingPlaceholder);
        }

        Ok(Platform {
            id,
            name,
            logo_url: self.logo_url.unwrap_or_default(),
            api_endpoint,
            curl_template,
            response_format,
            response_path: self.response_path.unwrap_or_default(),
            active: self.active.unwrap_or(true),
            icon: self
                .icon
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| DEFAULT_PLATFORM_ICON.to_string()),
            api_key: self.api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Overlays the set fields of this draft on an existing platform
    pub fn merged_onto(self, base: &Platform) -> PlatformDraft {
        PlatformDraft {
            name: self.name.or_else(|| Some(base.name.clone())),
            logo_url: self.logo_url.or_else(|| Some(base.logo_url.clone())),
            api_endpoint: self.api_endpoint.or_else(|| Some(base.api_endpoint.clone())),
            curl_template: self.curl_template.or_else(|| Some(base.curl_template.clone())),
            response_format: self
                .response_format
                .or_else(|| Some(base.response_format.to_string())),
            response_path: self.response_path.or_else(|| Some(base.response_path.clone())),
            active: self.active.or(Some(base.active)),
            icon: self.icon.or_else(|| Some(base.icon.clone())),
            api_key: self.api_key.or_else(|| base.api_key.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PlatformDraft {
        PlatformDraft {
            name: Some("Test".to_string()),
            api_endpoint: Some("https://sho.rt/api".to_string()),
            curl_template: Some(format!("curl -d \"url={}\" \"https://sho.rt/api\"", LINK_PLACEHOLDER)),
            response_format: Some("text".to_string()),
            ..PlatformDraft::default()
        }
    }

    #[test]
    fn draft_fills_defaults() {
        let platform = draft().into_platform(4).unwrap();
        assert_eq!(platform.id, 4);
        assert!(platform.active);
        assert_eq!(platform.icon, DEFAULT_PLATFORM_ICON);
        assert_eq!(platform.logo_url, "");
        assert_eq!(platform.response_path, "");
        assert_eq!(platform.response_format, ResponseFormat::Text);
    }

    #[test]
    fn draft_requires_fields_in_order() {
        let mut d = draft();
        d.api_endpoint = Some(String::new());
        assert_eq!(
            d.into_platform(1),
            Err(PlatformError::MissingField("api_endpoint"))
        );

        let mut d = draft();
        d.response_format = None;
        assert_eq!(
            d.into_platform(1),
            Err(PlatformError::MissingField("response_format"))
        );
    }

    #[test]
    fn draft_requires_link_placeholder() {
        let mut d = draft();
        d.curl_template = Some("curl https://sho.rt/api".to_string());
        assert_eq!(d.into_platform(1), Err(PlatformError::MissingPlaceholder));
    }

    #[test]
    fn draft_rejects_unknown_format() {
        let mut d = draft();
        d.response_format = Some("xml".to_string());
        assert_eq!(
            d.into_platform(1),
            Err(PlatformError::UnsupportedFormat("xml".to_string()))
        );
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let base = draft().into_platform(2).unwrap();
        let patch = PlatformDraft {
            name: Some("Renamed".to_string()),
            active: Some(false),
            ..PlatformDraft::default()
        };

        let merged = patch.merged_onto(&base).into_platform(2).unwrap();
        assert_eq!(merged.name, "Renamed");
        assert!(!merged.active);
        assert_eq!(merged.curl_template, base.curl_template);
    }

    #[test]
    fn active_defaults_to_true_when_absent() {
        let json = r#"{"id":1,"name":"X","curl_template":"echo ${link_download}"}"#;
        let platform: Platform = serde_json::from_str(json).unwrap();
        assert!(platform.active);
    }
}
