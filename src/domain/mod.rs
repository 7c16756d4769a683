//! Domain models for the catalog admin tool
//!
//! Contains the book and platform types and slug logic without any I/O.

mod book;
mod platform;
mod slug;

pub use book::{is_google_drive_url, Book, BookError, DownloadLink, OneOrMany, DEFAULT_LINK_ICON};
pub use platform::{
    Platform, PlatformDraft, PlatformError, ResponseFormat, API_KEY_PLACEHOLDER,
    DEFAULT_PLATFORM_ICON, LINK_PLACEHOLDER,
};
pub use slug::{slug, unique_filename, MARKDOWN_EXT};
