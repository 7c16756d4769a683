//! # Storage Layer
//!
//! Persistence for an e-book site, in formats a static-site generator and
//! git are both happy with.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Books | Markdown + YAML frontmatter | `_epubs/{slug}.md` |
//! | Platforms | JSON | `admin_tool/data/platforms.json` |
//! | Config | TOML | `.epub-admin/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`PlatformRegistry`] holds an `fs2` lock while reading or writing
//! - All writes are atomic (temp file + rename)
//!
//! ## Site Structure
//!
//! ```text
//! site/
//! ├── .epub-admin/
//! │   └── config.toml        # Site configuration
//! ├── _epubs/
//! │   └── test-book.md       # One page per book
//! └── admin_tool/data/
//!     └── platforms.json     # Shortening platforms
//! ```
//!
//! ## Key Types
//!
//! - [`Site`] - Entry point for accessing a site
//! - [`BookStore`] - Read/write books as markdown files
//! - [`PlatformRegistry`] - Read/write shortening platforms
//! - [`Config`] - Site and global configuration

mod config;
mod markdown;
mod platforms;
mod site;

pub use config::{
    Config, ConfigError, GitConfig, GlobalConfig, OutputFormat, ShortenerConfig, SiteConfig,
    ADMIN_DIR, DEFAULT_CONTENT_DIR, DEFAULT_PLATFORMS_FILE,
};
pub use markdown::{
    parse_markdown, render_markdown, BookStatistics, BookStore, ConversionReport, BODY_TEMPLATE,
    LAYOUT,
};
pub use platforms::{default_platforms, PlatformRegistry, PlatformStatistics, PlatformSummary};
pub use site::{Site, SiteError};
