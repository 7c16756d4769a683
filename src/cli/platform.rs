//! Platform CLI commands

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use super::output::Output;
use crate::domain::{Platform, PlatformDraft};
use crate::shortener::DEFAULT_SAMPLE_URL;
use crate::storage::Site;

#[derive(Subcommand)]
pub enum PlatformCommands {
    /// List shortening platforms
    List {
        /// Only active platforms
        #[arg(long)]
        active: bool,
    },

    /// Show platform details
    Show { id: u32 },

    /// Register a new platform
    Add(PlatformFields),

    /// Change fields of a platform
    Update {
        id: u32,

        #[command(flatten)]
        fields: PlatformFields,
    },

    /// Remove a platform
    Delete { id: u32 },

    /// Shorten a sample URL to check a platform works
    Test {
        id: u32,

        /// URL to shorten
        #[arg(long, default_value = DEFAULT_SAMPLE_URL)]
        url: String,
    },

    /// Show registry statistics
    Stats,
}

/// Platform fields accepted by `add` and `update`
#[derive(Args, Debug, Default)]
pub struct PlatformFields {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub logo_url: Option<String>,

    /// Service endpoint (informational)
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Command template containing ${link_download} (and optionally ${api_key})
    #[arg(long)]
    pub curl_template: Option<String>,

    /// Response format: text or json
    #[arg(long)]
    pub response_format: Option<String>,

    /// Dot-separated path to the short URL in a JSON response
    #[arg(long)]
    pub response_path: Option<String>,

    /// Whether the platform is offered for shortening
    #[arg(long)]
    pub active: Option<bool>,

    /// Icon class shown next to download links
    #[arg(long)]
    pub icon: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,
}

impl From<PlatformFields> for PlatformDraft {
    fn from(fields: PlatformFields) -> Self {
        PlatformDraft {
            name: fields.name,
            logo_url: fields.logo_url,
            api_endpoint: fields.api_endpoint,
            curl_template: fields.curl_template,
            response_format: fields.response_format,
            response_path: fields.response_path,
            active: fields.active,
            icon: fields.icon,
            api_key: fields.api_key,
        }
    }
}

pub fn run(cmd: PlatformCommands, output: &Output) -> Result<()> {
    let site = Site::open_current()?;
    let mut registry = site.platform_registry();

    match cmd {
        PlatformCommands::List { active } => {
            let platforms: Vec<&Platform> = if active {
                registry.get_active()
            } else {
                registry.all().iter().collect()
            };

            if output.is_json() {
                let redacted: Vec<Platform> = platforms.into_iter().map(redact).collect();
                output.data(&redacted);
            } else if platforms.is_empty() {
                println!("No platforms configured.");
            } else {
                println!("{:<5} {:<20} {:<8} ACTIVE", "ID", "NAME", "FORMAT");
                println!("{}", "-".repeat(45));
                for p in platforms {
                    println!(
                        "{:<5} {:<20} {:<8} {}",
                        p.id,
                        p.name,
                        p.response_format,
                        if p.active { "yes" } else { "no" }
                    );
                }
            }
        }

        PlatformCommands::Show { id } => {
            let platform = registry.require(id)?;
            if output.is_json() {
                output.data(&redact(platform));
            } else {
                println!("Platform: {} (ID: {})", platform.name, platform.id);
                println!("Active: {}", if platform.active { "yes" } else { "no" });
                println!("Endpoint: {}", platform.api_endpoint);
                println!("Template: {}", platform.curl_template);
                println!("Format: {}", platform.response_format);
                if !platform.response_path.is_empty() {
                    println!("Response path: {}", platform.response_path);
                }
                println!("Icon: {}", platform.icon);
                if platform.needs_api_key() {
                    let state = if platform.api_key.is_some() { "set" } else { "missing" };
                    println!("API key: {}", state);
                }
            }
        }

        PlatformCommands::Add(fields) => {
            let platform = registry.add(fields.into())?;
            if output.is_json() {
                output.data(&redact(&platform));
            } else {
                output.success(&format!(
                    "Added platform: {} (ID: {})",
                    platform.name, platform.id
                ));
            }
        }

        PlatformCommands::Update { id, fields } => {
            let draft = PlatformDraft::from(fields).merged_onto(registry.require(id)?);
            if !registry.update(id, draft)? {
                bail!("Platform not found: {}", id);
            }
            output.success(&format!("Updated platform {}", id));
        }

        PlatformCommands::Delete { id } => {
            if !registry.delete(id)? {
                bail!("Platform not found: {}", id);
            }
            output.success(&format!("Deleted platform {}", id));
        }

        PlatformCommands::Test { id, url } => {
            let platform = registry.require(id)?;
            let report = site.shortener().test(platform, &url);

            if output.is_json() {
                output.data(&report);
            } else if report.success {
                println!(
                    "{} works: {} ({:.2}s)",
                    platform.name, report.short_url, report.response_time
                );
            } else {
                bail!(
                    "{} failed: {}",
                    platform.name,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        PlatformCommands::Stats => {
            let stats = registry.statistics();
            if output.is_json() {
                output.data(&stats);
            } else {
                println!("Platforms: {}", stats.total_platforms);
                println!("Active: {}", stats.active_platforms);
                println!("Inactive: {}", stats.inactive_platforms);
                for (format, count) in &stats.platforms_by_format {
                    println!("  {}: {}", format, count);
                }
            }
        }
    }

    Ok(())
}

/// Copy of the platform safe to print or export
pub(super) fn redact(platform: &Platform) -> Platform {
    Platform {
        api_key: platform.api_key.as_ref().map(|_| "***".to_string()),
        ..platform.clone()
    }
}
