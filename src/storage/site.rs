//! Site management
//!
//! A site is a static-site checkout holding book pages. [`Site`] locates it,
//! initializes the admin files and hands out the stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{BookStore, Config, PlatformRegistry, ADMIN_DIR};
use crate::publish::{Publisher, SystemGit};
use crate::shortener::Shortener;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Not in an e-book site. Run 'epub-admin init' first.")]
    NotInSite,

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

const DEFAULT_CONFIG: &str = r#"# epub-admin site configuration

# Directory of book pages, relative to the site root
content_dir = "_epubs"

# Shortening platform registry, relative to the site root
platforms_file = "admin_tool/data/platforms.json"

[git]
remote = "origin"
branch = "main"
timeout_secs = 60
# user_name = "Your Name"
# user_email = "you@example.com"

[shortener]
timeout_secs = 30
# auto | command | http
transport = "auto"
http_timeout_secs = 30
"#;

/// An e-book site
pub struct Site {
    root: PathBuf,
    config: Config,
}

impl Site {
    /// Opens an existing site at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !Config::is_site_root(&root) {
            return Err(SiteError::NotInSite.into());
        }

        let config = Config::for_site(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the site containing the current directory
    pub fn open_current() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let root = Config::find_site_root(&cwd).ok_or(SiteError::NotInSite)?;

        Self::open(root)
    }

    /// Initializes admin files in `root`
    ///
    /// Existing files are left untouched, so running this twice is safe.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(SiteError::NotADirectory(root).into());
        }

        let admin_dir = root.join(ADMIN_DIR);
        fs::create_dir_all(&admin_dir).with_context(|| {
            format!("Failed to create {} directory: {}", ADMIN_DIR, admin_dir.display())
        })?;

        let config_path = Config::site_config_path(&root);
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let site = Self::open(root)?;

        let content_dir = site.content_dir();
        fs::create_dir_all(&content_dir).with_context(|| {
            format!(
                "Failed to create content directory: {}",
                content_dir.display()
            )
        })?;

        // Seeds the default platforms when the file is missing
        site.platform_registry();

        Ok(site)
    }

    /// Returns the site root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.config.site.content_dir)
    }

    pub fn platforms_path(&self) -> PathBuf {
        self.root.join(&self.config.site.platforms_file)
    }

    /// Returns the book store with its cache loaded
    pub fn book_store(&self) -> BookStore {
        BookStore::open(self.content_dir())
    }

    pub fn platform_registry(&self) -> PlatformRegistry {
        PlatformRegistry::load(self.platforms_path())
    }

    pub fn shortener(&self) -> Shortener {
        self.config.site.shortener.shortener()
    }

    /// Returns a publisher for the site's working copy
    pub fn publisher(&self, token: Option<String>) -> Publisher<SystemGit> {
        let git = &self.config.site.git;
        Publisher::new(&self.root, SystemGit::new(git.timeout()))
            .with_remote(git.remote.clone())
            .with_token(token)
    }

    /// Branch used when none is given
    pub fn default_branch(&self) -> &str {
        &self.config.site.git.branch
    }
}
