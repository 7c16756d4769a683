//! Main CLI application structure

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{book, git_cmd, platform};
use crate::shortener::Shorten;
use crate::storage::{Config, Site};

#[derive(Parser)]
#[command(name = "epub-admin")]
#[command(author, version, about = "Manage the books of a static e-book site")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config setting)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// GitHub token used for authenticated pushes
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize admin files in a site
    Init {
        /// Site root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Create, edit and convert books
    #[command(subcommand)]
    Book(book::BookCommands),

    /// Manage shortening platforms
    #[command(subcommand)]
    Platform(platform::PlatformCommands),

    /// Shorten a URL through a platform
    Shorten {
        url: String,

        /// Platform id
        #[arg(long, short)]
        platform: u32,
    },

    /// Commit, push and branch operations on the site
    #[command(subcommand)]
    Git(git_cmd::GitCommands),

    /// Export platforms and catalog counts as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Installs the stderr log subscriber
///
/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_format(flag: Option<OutputFormat>) -> OutputFormat {
    match flag {
        Some(format) => format,
        None => Config::load_global()
            .map(|global| global.default_format.into())
            .unwrap_or_default(),
    }
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(resolve_format(cli.format));
    let token = cli.github_token.as_deref();

    match cli.command {
        Commands::Init { path } => {
            debug!(path = %path.display(), "initializing site");
            let site = Site::init(&path)?;
            output.success(&format!(
                "Initialized e-book site at {}",
                site.root().display()
            ));
        }

        Commands::Book(cmd) => book::run(cmd, &output, token)?,
        Commands::Platform(cmd) => platform::run(cmd, &output)?,
        Commands::Shorten { url, platform } => shorten(&output, &url, platform)?,
        Commands::Git(cmd) => git_cmd::run(cmd, &output, token)?,
        Commands::Export { output: path } => export(&output, path)?,
    }

    Ok(())
}

fn shorten(output: &Output, url: &str, platform_id: u32) -> Result<()> {
    let site = Site::open_current()?;
    let registry = site.platform_registry();
    let platform = registry.require_active(platform_id)?;

    let outcome = site.shortener().shorten(url, platform);
    if let Some(error) = outcome.error() {
        anyhow::bail!("Could not shorten with {}: {}", platform.name, error);
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "platform": platform.name,
            "original_url": url,
            "short_url": outcome.url(),
        }));
    } else {
        println!("{}", outcome.url());
    }

    Ok(())
}

fn export(output: &Output, path: Option<PathBuf>) -> Result<()> {
    let site = Site::open_current()?;
    let registry = site.platform_registry();
    let books = site.book_store();

    let platforms: Vec<_> = registry.all().iter().map(platform::redact).collect();
    let data = serde_json::json!({
        "platforms": platforms,
        "books_count": books.len(),
        "export_time": Local::now().to_rfc3339(),
    });
    let json = serde_json::to_string_pretty(&data).context("Failed to serialize export")?;

    match path {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            output.success(&format!("Exported to {}", path.display()));
        }
        None => println!("{}", json),
    }

    Ok(())
}
