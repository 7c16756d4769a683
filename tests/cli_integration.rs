//! CLI integration tests for epub-admin
//!
//! These tests drive the binary against temporary sites, covering the
//! workflow from initialization through book and platform management.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the epub-admin binary
fn admin_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("epub-admin"))
}

/// Command running inside `dir`, isolated from the user's global config
fn site_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = admin_cmd();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env("HOME", dir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// Create a temporary directory and initialize a site in it
fn setup_site() -> TempDir {
    let dir = TempDir::new().unwrap();
    site_cmd(dir.path()).arg("init").assert().success();
    dir
}

fn add_book(dir: &Path, title: &str) -> assert_cmd::assert::Assert {
    site_cmd(dir)
        .args(["book", "add", "--title", title])
        .args(["--author", "Tác Giả"])
        .args(["--cover-image", "https://img.example/cover.jpg"])
        .args(["--description", "Một cuốn sách"])
        .args(["--genre", "Văn học, Tiểu thuyết"])
        .args(["--rating", "4"])
        .args(["--link", "Mega=https://mega.nz/file/abc"])
        .assert()
}

fn json_stdout(assert: &assert_cmd::assert::Assert) -> serde_json::Value {
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    site_cmd(dir.path())
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized e-book site"));

    assert!(dir.path().join(".epub-admin/config.toml").is_file());
    assert!(dir.path().join("_epubs").is_dir());
    assert!(dir.path().join("admin_tool/data/platforms.json").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = setup_site();
    site_cmd(dir.path()).arg("init").assert().success();
}

#[test]
fn test_commands_require_a_site() {
    let dir = TempDir::new().unwrap();

    site_cmd(dir.path())
        .args(["book", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in an e-book site"));
}

// =============================================================================
// Book Tests
// =============================================================================

#[test]
fn test_book_add_creates_markdown() {
    let dir = setup_site();

    add_book(dir.path(), "Test Book")
        .success()
        .stdout(predicate::str::contains("Created book: test-book.md"));

    let content = fs::read_to_string(dir.path().join("_epubs/test-book.md")).unwrap();
    assert!(content.starts_with("---\nlayout: epub\ntitle: Test Book\n"));
    assert!(content.contains("platform: Mega"));
    assert!(content.contains("{{ page.title }}"));
}

#[test]
fn test_book_add_suffixes_colliding_titles() {
    let dir = setup_site();

    add_book(dir.path(), "Test Book").success();
    add_book(dir.path(), "Test Book!")
        .success()
        .stdout(predicate::str::contains("test-book-1.md"));

    assert!(dir.path().join("_epubs/test-book-1.md").is_file());
}

#[test]
fn test_book_add_requires_fields() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["book", "add", "--title", "Lonely"])
        .args(["--link", "Mega=https://mega.nz/file/abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required field: author"));
}

#[test]
fn test_book_add_requires_a_link() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["book", "add", "--title", "T", "--author", "A"])
        .args(["--cover-image", "https://img.example/c.jpg", "--description", "D"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("download link is required"));
}

#[test]
fn test_book_add_rejects_malformed_link() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["book", "add", "--link", "no-equals-sign"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected NAME=URL"));
}

#[test]
fn test_book_list_and_show() {
    let dir = setup_site();
    add_book(dir.path(), "Hà Nội Mùa Thu").success();

    let assert = site_cmd(dir.path())
        .args(["--format", "json", "book", "list"])
        .assert()
        .success();
    let books = json_stdout(&assert);
    assert_eq!(books[0]["filename"], "ha-noi-mua-thu.md");
    assert_eq!(books[0]["links"], 1);

    site_cmd(dir.path())
        .args(["book", "show", "ha-noi-mua-thu.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Title: Hà Nội Mùa Thu"))
        .stdout(predicate::str::contains("Genre: Văn học, Tiểu thuyết"));
}

#[test]
fn test_book_show_missing() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["book", "show", "nope.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Book not found"));
}

#[test]
fn test_book_edit_rewrites_file() {
    let dir = setup_site();
    add_book(dir.path(), "Test Book").success();

    site_cmd(dir.path())
        .args(["book", "edit", "test-book.md", "--rating", "4.5", "--pages", "320"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated book: test-book.md"));

    let content = fs::read_to_string(dir.path().join("_epubs/test-book.md")).unwrap();
    assert!(content.contains("rating: 4.5"));
    assert!(content.contains("pages: 320"));
    assert!(content.contains("title: Test Book"));
}

#[test]
fn test_book_delete_is_idempotent() {
    let dir = setup_site();
    add_book(dir.path(), "Test Book").success();

    site_cmd(dir.path())
        .args(["book", "delete", "test-book.md"])
        .assert()
        .success();
    assert!(!dir.path().join("_epubs/test-book.md").exists());

    site_cmd(dir.path())
        .args(["book", "delete", "test-book.md"])
        .assert()
        .success();
}

#[test]
fn test_book_delete_rejects_paths() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["book", "delete", "../secret.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid book filename"));
}

#[test]
fn test_book_stats() {
    let dir = setup_site();
    add_book(dir.path(), "One").success();
    add_book(dir.path(), "Two").success();

    let assert = site_cmd(dir.path())
        .args(["--format", "json", "book", "stats"])
        .assert()
        .success();
    let stats = json_stdout(&assert);

    assert_eq!(stats["total_books"], 2);
    assert_eq!(stats["authors"], serde_json::json!(["Tác Giả"]));
    assert_eq!(stats["avg_rating"], 4.0);
}

// =============================================================================
// Platform Tests
// =============================================================================

#[test]
fn test_platform_list_has_defaults() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["platform", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TinyURL"))
        .stdout(predicate::str::contains("Is.gd"))
        .stdout(predicate::str::contains("V.gd"));
}

#[test]
fn test_platform_add_update_delete() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["platform", "add", "--name", "Custom"])
        .args(["--api-endpoint", "https://short.example/api"])
        .args(["--curl-template", "curl -X POST \"https://short.example/api\" -d \"url=${link_download}\""])
        .args(["--response-format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added platform: Custom (ID: 4)"));

    site_cmd(dir.path())
        .args(["platform", "update", "4", "--name", "Renamed", "--active", "false"])
        .assert()
        .success();

    let assert = site_cmd(dir.path())
        .args(["--format", "json", "platform", "show", "4"])
        .assert()
        .success();
    let platform = json_stdout(&assert);
    assert_eq!(platform["name"], "Renamed");
    assert_eq!(platform["active"], false);
    assert_eq!(platform["api_endpoint"], "https://short.example/api");

    site_cmd(dir.path())
        .args(["platform", "delete", "4"])
        .assert()
        .success();
    site_cmd(dir.path())
        .args(["platform", "delete", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Platform not found: 4"));
}

#[test]
fn test_platform_add_requires_placeholder() {
    let dir = setup_site();

    site_cmd(dir.path())
        .args(["platform", "add", "--name", "Broken"])
        .args(["--api-endpoint", "https://short.example/api"])
        .args(["--curl-template", "curl https://short.example/api"])
        .args(["--response-format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("${link_download}"));
}

#[test]
fn test_platform_stats() {
    let dir = setup_site();

    let assert = site_cmd(dir.path())
        .args(["--format", "json", "platform", "stats"])
        .assert()
        .success();
    let stats = json_stdout(&assert);

    assert_eq!(stats["total_platforms"], 3);
    assert_eq!(stats["platforms_by_format"]["text"], 3);
}

// =============================================================================
// Shortening and Conversion Tests (shell templates)
// =============================================================================

#[cfg(unix)]
fn add_echo_platform(dir: &Path) {
    site_cmd(dir)
        .args(["platform", "add", "--name", "Echo"])
        .args(["--api-endpoint", "local"])
        .args(["--curl-template", "echo 'https://sho.rt/abc' # ${link_download}"])
        .args(["--response-format", "text"])
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn test_shorten_with_shell_platform() {
    let dir = setup_site();
    add_echo_platform(dir.path());

    site_cmd(dir.path())
        .args(["shorten", "https://drive.google.com/file/d/1/view", "--platform", "4"])
        .assert()
        .success()
        .stdout(predicate::str::diff("https://sho.rt/abc\n"));
}

#[cfg(unix)]
#[test]
fn test_shorten_refuses_inactive_platform() {
    let dir = setup_site();
    add_echo_platform(dir.path());

    site_cmd(dir.path())
        .args(["platform", "update", "4", "--active", "false"])
        .assert()
        .success();

    site_cmd(dir.path())
        .args(["shorten", "https://drive.google.com/file/d/1/view", "--platform", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Platform 4 is inactive"));
}

#[cfg(unix)]
#[test]
fn test_book_add_with_drive_link() {
    let dir = setup_site();
    add_echo_platform(dir.path());

    site_cmd(dir.path())
        .args(["book", "add", "--title", "Drive Book", "--author", "A"])
        .args(["--cover-image", "https://img.example/c.jpg", "--description", "D"])
        .args(["--drive-link", "https://drive.google.com/file/d/1/view", "--platform", "4"])
        .assert()
        .success();

    let content = fs::read_to_string(dir.path().join("_epubs/drive-book.md")).unwrap();
    assert!(content.contains("url: https://sho.rt/abc"));
    assert!(content.contains("platform: Echo"));
    assert!(content.contains("index: 4"));
}

#[cfg(unix)]
#[test]
fn test_book_convert_only_touches_drive_links() {
    let dir = setup_site();
    add_echo_platform(dir.path());

    site_cmd(dir.path())
        .args(["book", "add", "--title", "Mixed", "--author", "A"])
        .args(["--cover-image", "https://img.example/c.jpg", "--description", "D"])
        .args(["--link", "Drive=https://drive.google.com/file/d/1/view"])
        .args(["--link", "Mega=https://mega.nz/file/abc"])
        .assert()
        .success();
    add_book(dir.path(), "Mega Only").success();

    let assert = site_cmd(dir.path())
        .args(["--format", "json", "book", "convert", "--platform", "4"])
        .assert()
        .success();
    let report = json_stdout(&assert);
    assert_eq!(report["converted"], 1);
    assert_eq!(report["skipped"], 1);

    let mixed = fs::read_to_string(dir.path().join("_epubs/mixed.md")).unwrap();
    assert!(mixed.contains("url: https://sho.rt/abc"));
    assert!(mixed.contains("url: https://mega.nz/file/abc"));
    assert!(!mixed.contains("drive.google.com"));
}

// =============================================================================
// Export Tests
// =============================================================================

#[test]
fn test_export_writes_json() {
    let dir = setup_site();
    add_book(dir.path(), "Test Book").success();
    let target = dir.path().join("export.json");

    site_cmd(dir.path())
        .args(["export", "--output"])
        .arg(&target)
        .assert()
        .success();

    let data: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(data["books_count"], 1);
    assert_eq!(data["platforms"].as_array().unwrap().len(), 3);
    assert!(data["export_time"].is_string());
}

#[test]
fn test_export_masks_api_keys() {
    let dir = setup_site();
    site_cmd(dir.path())
        .args(["platform", "add", "--name", "Keyed"])
        .args(["--api-endpoint", "https://sho.rt/api"])
        .args(["--curl-template", "curl -X POST \"https://sho.rt/api?key=${api_key}\" -d \"url=${link_download}\""])
        .args(["--response-format", "text"])
        .args(["--api-key", "secret-key-123"])
        .assert()
        .success();

    let assert = site_cmd(dir.path()).arg("export").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("secret-key-123"));

    let data = json_stdout(&assert);
    let keyed = data["platforms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Keyed")
        .unwrap();
    assert_eq!(keyed["api_key"], "***");
}

// =============================================================================
// Git Tests
// =============================================================================

/// Initialize a git repository in `dir`, or return false when git is missing
fn git_init(dir: &Path) -> bool {
    std::process::Command::new("git")
        .arg("init")
        .current_dir(dir)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[test]
fn test_git_status_leaves_identity_unset() {
    let dir = setup_site();
    if !git_init(dir.path()) {
        return;
    }

    site_cmd(dir.path())
        .env("GITHUB_USERNAME", "Site Librarian")
        .env("GITHUB_EMAIL", "librarian@example.com")
        .args(["git", "status"])
        .assert()
        .success();

    let config = fs::read_to_string(dir.path().join(".git/config")).unwrap();
    assert!(!config.contains("Site Librarian"));
    assert!(!config.contains("librarian@example.com"));
}

#[test]
fn test_git_publish_applies_identity_before_commit() {
    let dir = setup_site();
    if !git_init(dir.path()) {
        return;
    }

    // No remote is configured, so the push stage fails after the commit
    site_cmd(dir.path())
        .env("GITHUB_USERNAME", "Site Librarian")
        .env("GITHUB_EMAIL", "librarian@example.com")
        .args(["git", "publish", "Initial catalog"])
        .assert()
        .failure();

    let config = fs::read_to_string(dir.path().join(".git/config")).unwrap();
    assert!(config.contains("Site Librarian"));
    assert!(config.contains("librarian@example.com"));
}
