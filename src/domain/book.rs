//! Book domain model
//!
//! A book is one page of the catalog. It is stored as a markdown file whose
//! YAML frontmatter carries every field below; the filename is derived from
//! the title once and never changes afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::platform::Platform;

/// Icon used for download links when the platform has none
pub const DEFAULT_LINK_ICON: &str = "fas fa-download";

#[derive(Debug, Error, PartialEq)]
pub enum BookError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Rating must be between 0.0 and 5.0, got {0}")]
    InvalidRating(f64),

    #[error("Invalid book filename: {0}")]
    InvalidFilename(String),
}

/// A value that frontmatter may hold either as a scalar or as a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Builds a list from comma separated input, dropping blank entries
    pub fn from_csv(input: &str) -> Self {
        Self::Many(
            input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Iterates over the non-empty values
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            OneOrMany::One(s) => std::slice::from_ref(s),
            OneOrMany::Many(v) => v,
        };
        slice.iter().map(String::as_str).filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

/// A download entry shown on the book page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// Display name of the hosting/shortening platform
    pub platform: String,

    /// Target URL (usually shortened)
    pub url: String,

    /// Ordering key on the page
    #[serde(default)]
    pub index: u32,

    /// Font Awesome icon identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl DownloadLink {
    /// Creates a manually entered link
    pub fn new(platform: impl Into<String>, url: impl Into<String>, index: u32) -> Self {
        Self {
            platform: platform.into(),
            url: url.into(),
            index,
            icon: None,
        }
    }

    /// Creates the link produced by shortening through `platform`
    pub fn for_platform(platform: &Platform, url: impl Into<String>) -> Self {
        let icon = if platform.icon.is_empty() {
            DEFAULT_LINK_ICON.to_string()
        } else {
            platform.icon.clone()
        };

        Self {
            platform: platform.name.clone(),
            url: url.into(),
            index: platform.id,
            icon: Some(icon),
        }
    }

    /// Returns true if the link points at Google Drive or Google Docs
    pub fn is_google_drive(&self) -> bool {
        is_google_drive_url(&self.url)
    }
}

/// Returns true if the URL host is a Google Drive/Docs host
pub fn is_google_drive_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(
            parsed.host_str(),
            Some("drive.google.com") | Some("docs.google.com")
        ),
        Err(_) => false,
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Book {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub cover_image: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub preview_image: Option<String>,

    #[serde(default)]
    pub isbn: Option<String>,

    /// Publication date as written by the operator (e.g. `2024-05-01`)
    #[serde(default)]
    pub published_date: Option<String>,

    #[serde(default)]
    pub genre: Option<OneOrMany>,

    /// Rating on a 0.0 - 5.0 scale
    #[serde(default)]
    pub rating: Option<f64>,

    #[serde(default)]
    pub pages: Option<u32>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub publisher: Option<String>,

    #[serde(default)]
    pub tags: Option<OneOrMany>,

    /// Excerpt shown on the page before the download section
    #[serde(default)]
    pub preview_content: Option<String>,

    #[serde(default)]
    pub download_links: Vec<DownloadLink>,

    #[serde(default)]
    pub download_config_url: Option<String>,

    /// Basename of the backing file, set by the store
    #[serde(skip)]
    pub filename: Option<String>,

    /// Raw markdown body following the frontmatter
    #[serde(skip)]
    pub content: String,
}

impl Book {
    /// Creates a book with the required fields
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        cover_image: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            cover_image: cover_image.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Checks the required fields and value ranges
    pub fn validate(&self) -> Result<(), BookError> {
        let required = [
            ("title", &self.title),
            ("author", &self.author),
            ("cover_image", &self.cover_image),
            ("description", &self.description),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BookError::MissingField(name));
            }
        }

        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(BookError::InvalidRating(rating));
            }
        }

        Ok(())
    }

    /// Iterates over the book's genres, whether stored as one value or a list
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.genre.iter().flat_map(OneOrMany::values)
    }

    /// Adds a download link, placing it after the existing ones
    pub fn push_link(&mut self, link: DownloadLink) {
        self.download_links.push(link);
    }
}
