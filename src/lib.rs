//! epub-admin - administration tool for a static e-book site
//!
//! Books live as markdown pages with YAML frontmatter in the site's content
//! directory. Download links can be shortened through declaratively
//! configured platforms, and changes are published with git.

pub mod cli;
pub mod domain;
pub mod process;
pub mod publish;
pub mod shortener;
pub mod storage;

pub use domain::{Book, DownloadLink, Platform};
pub use storage::{BookStore, PlatformRegistry, Site};
