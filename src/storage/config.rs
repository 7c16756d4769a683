//! Configuration handling
//!
//! Configuration is stored in `.epub-admin/config.toml` (site) and
//! `~/.config/epub-admin/config.toml` (global). Every field has a default,
//! so an empty or missing file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shortener::{Shortener, Transport};

/// Directory holding site-level admin state
pub const ADMIN_DIR: &str = ".epub-admin";

/// Default directory for book pages, relative to the site root
pub const DEFAULT_CONTENT_DIR: &str = "_epubs";

/// Default platform registry path, relative to the site root
pub const DEFAULT_PLATFORMS_FILE: &str = "admin_tool/data/platforms.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Git publishing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Remote that receives pushes
    pub remote: String,

    /// Branch used when none is given on the command line
    pub branch: String,

    /// Timeout for a single git invocation
    pub timeout_secs: u64,

    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: "main".to_string(),
            timeout_secs: 60,
            user_name: None,
            user_email: None,
        }
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Link shortening settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortenerConfig {
    /// Timeout for a shortening command
    pub timeout_secs: u64,

    /// How templates are executed
    pub transport: Transport,

    /// Timeout for direct HTTP requests
    pub http_timeout_secs: u64,
}

impl Default for ShortenerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            transport: Transport::Auto,
            http_timeout_secs: 30,
        }
    }
}

impl ShortenerConfig {
    /// Builds the executor these settings describe
    pub fn shortener(&self) -> Shortener {
        Shortener::new(Duration::from_secs(self.timeout_secs), self.transport)
            .with_http_timeout(Duration::from_secs(self.http_timeout_secs))
    }
}

/// Site-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory of book pages, relative to the site root
    pub content_dir: String,

    /// Platform registry file, relative to the site root
    pub platforms_file: String,

    pub git: GitConfig,
    pub shortener: ShortenerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: DEFAULT_CONTENT_DIR.to_string(),
            platforms_file: DEFAULT_PLATFORMS_FILE.to_string(),
            git: GitConfig::default(),
            shortener: ShortenerConfig::default(),
        }
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Commit author used when the site config names none
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration for one site (global + site)
#[derive(Debug, Clone)]
pub struct Config {
    pub site: SiteConfig,
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration for a specific site
    pub fn for_site(site_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let site = Self::load_site_config(site_root)?;

        Ok(Self { site, global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "epub-admin", "epub-admin")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads the global configuration, defaults when absent
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads site configuration from a specific root
    pub fn load_site_config(site_root: &Path) -> Result<SiteConfig> {
        let config_path = Self::site_config_path(site_root);

        if !config_path.exists() {
            return Ok(SiteConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read site config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse site config")
    }

    pub fn site_config_path(site_root: &Path) -> PathBuf {
        site_root.join(ADMIN_DIR).join("config.toml")
    }

    /// Walks up from `start` to the first directory that looks like a site
    ///
    /// A site has either an `.epub-admin/` directory or the default content
    /// directory.
    pub fn find_site_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if Self::is_site_root(&current) {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    pub fn is_site_root(dir: &Path) -> bool {
        dir.join(ADMIN_DIR).is_dir() || dir.join(DEFAULT_CONTENT_DIR).is_dir()
    }

    /// Resolves the commit identity: site config, global config, then
    /// `GITHUB_USERNAME` / `GITHUB_EMAIL`
    pub fn git_identity(&self) -> Option<(String, String)> {
        let name = self
            .site
            .git
            .user_name
            .clone()
            .or_else(|| self.global.git_user_name.clone())
            .or_else(|| std::env::var("GITHUB_USERNAME").ok())
            .filter(|s| !s.is_empty())?;
        let email = self
            .site
            .git
            .user_email
            .clone()
            .or_else(|| self.global.git_user_email.clone())
            .or_else(|| std::env::var("GITHUB_EMAIL").ok())
            .filter(|s| !s.is_empty())?;

        Some((name, email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = SiteConfig::default();

        assert_eq!(config.content_dir, "_epubs");
        assert_eq!(config.platforms_file, "admin_tool/data/platforms.json");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.git.timeout(), Duration::from_secs(60));
        assert_eq!(config.shortener.timeout_secs, 30);
        assert_eq!(config.shortener.transport, Transport::Auto);
    }

    #[test]
    fn parse_partial_site_config() {
        let toml = r#"
content_dir = "books"

[git]
branch = "gh-pages"
user_name = "Librarian"

[shortener]
transport = "command"
"#;

        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.content_dir, "books");
        assert_eq!(config.platforms_file, DEFAULT_PLATFORMS_FILE);
        assert_eq!(config.git.branch, "gh-pages");
        assert_eq!(config.git.remote, "origin");
        assert_eq!(config.git.user_name.as_deref(), Some("Librarian"));
        assert_eq!(config.shortener.transport, Transport::Command);
        assert_eq!(config.shortener.http_timeout_secs, 30);
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
git_user_email = "me@example.com"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.git_user_email.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn invalid_site_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(ADMIN_DIR)).unwrap();
        fs::write(Config::site_config_path(dir.path()), "content_dir = [").unwrap();

        assert!(Config::load_site_config(dir.path()).is_err());
    }

    #[test]
    fn find_site_root_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(ADMIN_DIR)).unwrap();
        let sub_dir = dir.path().join("assets").join("img");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_site_root(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn content_dir_marks_a_site() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(DEFAULT_CONTENT_DIR)).unwrap();

        assert_eq!(Config::find_site_root(dir.path()).as_deref(), Some(dir.path()));
    }

    #[test]
    fn site_identity_wins_over_global() {
        let config = Config {
            site: SiteConfig {
                git: GitConfig {
                    user_name: Some("Site".to_string()),
                    user_email: Some("site@example.com".to_string()),
                    ..GitConfig::default()
                },
                ..SiteConfig::default()
            },
            global: GlobalConfig {
                git_user_name: Some("Global".to_string()),
                git_user_email: Some("global@example.com".to_string()),
                ..GlobalConfig::default()
            },
        };

        assert_eq!(
            config.git_identity(),
            Some(("Site".to_string(), "site@example.com".to_string()))
        );
    }
}
