//! JSON storage for shortening platforms
//!
//! The registry file holds the full platform list plus a last-updated
//! timestamp and is rewritten wholesale on every mutation:
//!
//! ```json
//! { "platforms": [ { "id": 1, "name": "TinyURL", ... } ], "last_updated": "..." }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{Platform, PlatformDraft, PlatformError, ResponseFormat};

/// On-disk layout of the registry file
#[derive(Debug, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    platforms: Vec<Platform>,

    #[serde(default)]
    last_updated: Option<String>,

    /// Highest id ever handed out, so deleted ids are not reused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_assigned_id: Option<u32>,
}

/// Built-in platforms used when no registry file exists
pub fn default_platforms() -> Vec<Platform> {
    let platform = |id: u32, name: &str, logo: &str, endpoint: &str, form: &str, icon: &str| Platform {
        id,
        name: name.to_string(),
        logo_url: logo.to_string(),
        api_endpoint: endpoint.to_string(),
        curl_template: format!("curl -X POST \"{}\" -d \"{}\"", endpoint, form),
        response_format: ResponseFormat::Text,
        response_path: String::new(),
        active: true,
        icon: icon.to_string(),
        api_key: None,
    };

    vec![
        platform(
            1,
            "TinyURL",
            "https://tinyurl.com/app/themes/tinyurl/images/tinyurl-logo.svg",
            "https://tinyurl.com/api-create.php",
            "url=${link_download}",
            "fas fa-link",
        ),
        platform(
            2,
            "Is.gd",
            "https://is.gd/images/logo.png",
            "https://is.gd/create.php",
            "format=simple&url=${link_download}",
            "fas fa-compress-alt",
        ),
        platform(
            3,
            "V.gd",
            "https://v.gd/images/logo.png",
            "https://v.gd/create.php",
            "format=simple&url=${link_download}",
            "fas fa-external-link-alt",
        ),
    ]
}

/// Per-platform line in [`PlatformStatistics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSummary {
    pub id: u32,
    pub name: String,
    pub active: bool,
    pub format: ResponseFormat,
}

/// Counts over the registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStatistics {
    pub total_platforms: usize,
    pub active_platforms: usize,
    pub inactive_platforms: usize,
    pub platforms_by_format: BTreeMap<String, usize>,
    pub platforms_list: Vec<PlatformSummary>,
}

/// Registry of shortening platforms backed by a JSON file
pub struct PlatformRegistry {
    path: PathBuf,
    platforms: Vec<Platform>,
    last_assigned_id: u32,
}

impl PlatformRegistry {
    /// Loads the registry, falling back to the built-in platforms
    ///
    /// A missing or unreadable file is replaced by the defaults, which are
    /// written back immediately.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut registry = Self {
            path: path.into(),
            platforms: Vec::new(),
            last_assigned_id: 0,
        };
        registry.reload();
        registry
    }

    /// Re-reads the registry file
    pub fn reload(&mut self) {
        match self.read_file() {
            Ok(file) => {
                self.platforms = file.platforms;
                self.last_assigned_id = file.last_assigned_id.unwrap_or(0);
                debug!(count = self.platforms.len(), path = %self.path.display(), "loaded platforms");
            }
            Err(e) => {
                if self.path.exists() {
                    warn!(path = %self.path.display(), error = %format!("{:#}", e), "invalid platform registry, using defaults");
                }
                self.platforms = default_platforms();
                self.last_assigned_id = 0;
                if let Err(e) = self.save() {
                    warn!(path = %self.path.display(), error = %format!("{:#}", e), "failed to persist default platforms");
                }
            }
        }
    }

    fn read_file(&self) -> Result<RegistryFile> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open platform registry: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on platform registry")?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .with_context(|| format!("Failed to read platform registry: {}", self.path.display()))?;

        serde_json::from_str(&content).context("Failed to parse platform registry")
    }

    /// Writes the registry atomically (temp file + rename)
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Held for the duration of the write; released on drop
        let lock = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open platform registry: {}", self.path.display()))?;
        lock.lock_exclusive()
            .context("Failed to acquire write lock on platform registry")?;

        let data = RegistryFile {
            platforms: self.platforms.clone(),
            last_updated: Some(Utc::now().to_rfc3339()),
            last_assigned_id: Some(self.last_assigned_id).filter(|id| *id > self.max_id()),
        };
        let json = serde_json::to_string_pretty(&data).context("Failed to serialize platforms")?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Returns the registry file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every platform in registry order
    pub fn all(&self) -> &[Platform] {
        &self.platforms
    }

    /// Returns platforms whose `active` flag is set
    pub fn get_active(&self) -> Vec<&Platform> {
        self.platforms.iter().filter(|p| p.active).collect()
    }

    /// Looks up a platform by id
    pub fn get(&self, id: u32) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    fn max_id(&self) -> u32 {
        self.platforms.iter().map(|p| p.id).max().unwrap_or(0)
    }

    /// Returns the id the next `add` will assign
    pub fn next_id(&self) -> u32 {
        self.max_id().max(self.last_assigned_id) + 1
    }

    /// Validates and appends a platform, assigning it a fresh id
    pub fn add(&mut self, draft: PlatformDraft) -> Result<Platform> {
        let platform = draft.into_platform(self.next_id())?;

        self.last_assigned_id = platform.id;
        self.platforms.push(platform.clone());
        self.save()?;

        debug!(id = platform.id, name = %platform.name, "added platform");
        Ok(platform)
    }

    /// Replaces the platform with `id`; the id itself never changes
    ///
    /// Returns `Ok(false)` when no platform has that id.
    pub fn update(&mut self, id: u32, draft: PlatformDraft) -> Result<bool> {
        let Some(index) = self.platforms.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        self.platforms[index] = draft.into_platform(id)?;
        self.save()?;

        debug!(id, "updated platform");
        Ok(true)
    }

    /// Removes the platform with `id`
    pub fn delete(&mut self, id: u32) -> Result<bool> {
        let Some(index) = self.platforms.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        self.last_assigned_id = self.last_assigned_id.max(self.max_id());
        self.platforms.remove(index);
        self.save()?;

        debug!(id, "deleted platform");
        Ok(true)
    }

    /// Looks up a platform or fails with [`PlatformError::NotFound`]
    pub fn require(&self, id: u32) -> Result<&Platform, PlatformError> {
        self.get(id).ok_or(PlatformError::NotFound(id))
    }

    /// Looks up a platform that may be used for shortening
    pub fn require_active(&self, id: u32) -> Result<&Platform, PlatformError> {
        let platform = self.require(id)?;
        if !platform.active {
            return Err(PlatformError::Inactive(id));
        }
        Ok(platform)
    }

    pub fn statistics(&self) -> PlatformStatistics {
        let mut by_format = BTreeMap::new();
        for platform in &self.platforms {
            *by_format
                .entry(platform.response_format.to_string())
                .or_insert(0) += 1;
        }

        let active = self.platforms.iter().filter(|p| p.active).count();

        PlatformStatistics {
            total_platforms: self.platforms.len(),
            active_platforms: active,
            inactive_platforms: self.platforms.len() - active,
            platforms_by_format: by_format,
            platforms_list: self
                .platforms
                .iter()
                .map(|p| PlatformSummary {
                    id: p.id,
                    name: p.name.clone(),
                    active: p.active,
                    format: p.response_format,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LINK_PLACEHOLDER;
    use tempfile::TempDir;

    fn draft(name: &str) -> PlatformDraft {
        PlatformDraft {
            name: Some(name.to_string()),
            api_endpoint: Some("https://test.com/api".to_string()),
            curl_template: Some(format!(
                "curl -X POST \"https://test.com/api\" -d \"url={}\"",
                LINK_PLACEHOLDER
            )),
            response_format: Some("text".to_string()),
            ..PlatformDraft::default()
        }
    }

    fn empty_registry(dir: &TempDir) -> PlatformRegistry {
        let path = dir.path().join("platforms.json");
        fs::write(&path, r#"{"platforms": [], "last_updated": null}"#).unwrap();
        PlatformRegistry::load(path)
    }

    #[test]
    fn missing_file_is_seeded_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("platforms.json");

        let registry = PlatformRegistry::load(&path);
        assert_eq!(registry.all().len(), 3);
        assert_eq!(registry.get(2).unwrap().name, "Is.gd");
        assert!(path.is_file());

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["platforms"].as_array().unwrap().len(), 3);
        assert!(raw["last_updated"].is_string());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("platforms.json");
        fs::write(&path, "{ not json").unwrap();

        let registry = PlatformRegistry::load(&path);
        assert_eq!(registry.all().len(), 3);

        let reloaded = PlatformRegistry::load(&path);
        assert_eq!(reloaded.all(), registry.all());
    }

    #[test]
    fn ids_start_at_one_and_increment() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);

        assert_eq!(registry.add(draft("A")).unwrap().id, 1);
        assert_eq!(registry.add(draft("B")).unwrap().id, 2);
    }

    #[test]
    fn ids_follow_max_existing() {
        let dir = TempDir::new().unwrap();
        let mut registry = PlatformRegistry::load(dir.path().join("platforms.json"));

        let added = registry.add(draft("Custom")).unwrap();
        assert_eq!(added.id, 4);
        assert!(added.active);
        assert_eq!(added.icon, "fas fa-link");
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);

        registry.add(draft("A")).unwrap();
        let b = registry.add(draft("B")).unwrap();
        assert!(registry.delete(b.id).unwrap());

        let reloaded_id = PlatformRegistry::load(registry.path()).next_id();
        assert_eq!(reloaded_id, 3);
        assert_eq!(registry.add(draft("C")).unwrap().id, 3);
    }

    #[test]
    fn add_rejects_missing_fields() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);

        let mut bad = draft("Bad");
        bad.curl_template = None;
        let err = registry.add(bad).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlatformError>(),
            Some(&PlatformError::MissingField("curl_template"))
        );
        assert!(registry.all().is_empty());
    }

    #[test]
    fn update_keeps_id_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);
        let added = registry.add(draft("Old")).unwrap();

        assert!(registry.update(added.id, draft("New")).unwrap());
        assert!(!registry.update(99, draft("Nobody")).unwrap());

        let reloaded = PlatformRegistry::load(registry.path());
        assert_eq!(reloaded.get(added.id).unwrap().name, "New");
    }

    #[test]
    fn delete_unknown_returns_false() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);
        assert!(!registry.delete(42).unwrap());
    }

    #[test]
    fn active_filter_and_statistics() {
        let dir = TempDir::new().unwrap();
        let mut registry = PlatformRegistry::load(dir.path().join("platforms.json"));

        let mut inactive = draft("Paused");
        inactive.active = Some(false);
        inactive.response_format = Some("json".to_string());
        inactive.response_path = Some("data.url".to_string());
        registry.add(inactive).unwrap();

        assert_eq!(registry.get_active().len(), 3);

        let stats = registry.statistics();
        assert_eq!(stats.total_platforms, 4);
        assert_eq!(stats.active_platforms, 3);
        assert_eq!(stats.inactive_platforms, 1);
        assert_eq!(stats.platforms_by_format.get("text"), Some(&3));
        assert_eq!(stats.platforms_by_format.get("json"), Some(&1));
        assert_eq!(stats.platforms_list[3].name, "Paused");
    }

    #[test]
    fn require_active_rejects_paused_platforms() {
        let dir = TempDir::new().unwrap();
        let mut registry = empty_registry(&dir);
        let live = registry.add(draft("Live")).unwrap();
        let mut paused = draft("Paused");
        paused.active = Some(false);
        let paused = registry.add(paused).unwrap();

        assert_eq!(registry.require_active(live.id).unwrap().name, "Live");
        assert_eq!(
            registry.require_active(paused.id).unwrap_err(),
            PlatformError::Inactive(paused.id)
        );
        assert_eq!(registry.require_active(99).unwrap_err(), PlatformError::NotFound(99));
        assert_eq!(
            PlatformError::Inactive(paused.id).to_string(),
            format!("Platform {} is inactive", paused.id)
        );
    }
}
