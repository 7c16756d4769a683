//! Git CLI commands

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::debug;

use super::output::Output;
use crate::publish::{PublishOutcome, Publisher};
use crate::storage::Site;

#[derive(Subcommand)]
pub enum GitCommands {
    /// Show branch, pending changes and the last commit
    Status,

    /// Pull from the configured remote
    Pull {
        /// Branch (defaults to the configured branch)
        #[arg(long, short)]
        branch: Option<String>,
    },

    /// Push to the configured remote
    Push {
        /// Branch (defaults to the configured branch)
        #[arg(long, short)]
        branch: Option<String>,
    },

    /// Stage everything, commit and push
    Publish {
        /// Commit message
        message: String,

        /// Branch (defaults to the configured branch)
        #[arg(long, short)]
        branch: Option<String>,
    },

    /// Set the repository-local commit author
    Identity { name: String, email: String },

    /// List, create or switch branches
    #[command(subcommand)]
    Branch(BranchCommands),
}

#[derive(Subcommand)]
pub enum BranchCommands {
    /// List local and remote branches
    List,

    /// Create a branch and switch to it
    Create { name: String },

    /// Switch to an existing branch
    Switch { name: String },
}

/// `--publish` flags shared by commands that change book files
#[derive(Args, Debug, Default)]
pub struct PublishArgs {
    /// Commit and push the change
    #[arg(long)]
    pub publish: bool,

    /// Branch to push (defaults to the configured branch)
    #[arg(long, requires = "publish")]
    pub branch: Option<String>,
}

pub fn run(cmd: GitCommands, output: &Output, token: Option<&str>) -> Result<()> {
    let site = Site::open_current()?;
    let publisher = publisher(&site, token)?;
    let branch_or_default = |branch: Option<String>| {
        branch.unwrap_or_else(|| site.default_branch().to_string())
    };

    match cmd {
        GitCommands::Status => status(output, &publisher)?,

        GitCommands::Pull { branch } => {
            let branch = branch_or_default(branch);
            publisher.pull(&branch)?;
            output.success(&format!("Pulled {} from {}", branch, publisher.remote()));
        }

        GitCommands::Push { branch } => {
            let branch = branch_or_default(branch);
            publisher.push(&branch)?;
            output.success(&format!("Pushed {} to {}", branch, publisher.remote()));
        }

        GitCommands::Publish { message, branch } => {
            let branch = branch_or_default(branch);
            apply_identity(&site, &publisher)?;
            let outcome = publisher.batch_commit_push(&message, &branch);
            report(output, outcome, &branch)?;
        }

        GitCommands::Identity { name, email } => {
            publisher.configure_identity(&name, &email)?;
            output.success(&format!("Commit author set to {} <{}>", name, email));
        }

        GitCommands::Branch(cmd) => match cmd {
            BranchCommands::List => {
                let branches = publisher.list_branches()?;
                if output.is_json() {
                    output.data(&branches);
                } else if branches.is_empty() {
                    println!("No other branches.");
                } else {
                    for branch in branches {
                        println!("{}", branch);
                    }
                }
            }
            BranchCommands::Create { name } => {
                publisher.create_branch(&name)?;
                output.success(&format!("Created and switched to branch {}", name));
            }
            BranchCommands::Switch { name } => {
                publisher.switch_branch(&name)?;
                output.success(&format!("Switched to branch {}", name));
            }
        },
    }

    Ok(())
}

fn status(output: &Output, publisher: &Publisher) -> Result<()> {
    let status = publisher.status()?;

    if output.is_json() {
        output.data(&status);
        return Ok(());
    }

    println!("Repository: {}", status.repo_path.display());
    println!("Branch: {}", status.current_branch);
    println!(
        "Changes: {}",
        if status.has_changes { "uncommitted changes" } else { "clean" }
    );
    if let Some(url) = &status.remote_url {
        println!("Remote: {}", url);
    }
    if let Some(commit) = &status.last_commit {
        println!("\nLast commit: {} {}", commit.hash, commit.message);
        println!("  {} ({})", commit.author, commit.date);
    }

    Ok(())
}

/// Opens the site's publisher, creating the repository if needed
pub(super) fn publisher(site: &Site, token: Option<&str>) -> Result<Publisher> {
    let publisher = site.publisher(token.map(String::from));
    publisher.ensure_repository()?;
    Ok(publisher)
}

/// Applies the configured commit identity before a commit is made
fn apply_identity(site: &Site, publisher: &Publisher) -> Result<()> {
    if let Some((name, email)) = site.config().git_identity() {
        debug!(%name, %email, "configuring commit identity");
        publisher.configure_identity(&name, &email)?;
    }
    Ok(())
}

/// Commits and pushes one changed book file when `--publish` was given
pub(super) fn publish_file(
    site: &Site,
    output: &Output,
    token: Option<&str>,
    args: &PublishArgs,
    path: &Path,
    message: &str,
) -> Result<()> {
    if !args.publish {
        return Ok(());
    }

    let branch = args
        .branch
        .clone()
        .unwrap_or_else(|| site.default_branch().to_string());
    let publisher = publisher(site, token)?;
    apply_identity(site, &publisher)?;
    report(output, publisher.add_commit_push(path, message, &branch), &branch)
}

/// Commits and pushes everything when `--publish` was given
pub(super) fn publish_all(
    site: &Site,
    output: &Output,
    token: Option<&str>,
    args: &PublishArgs,
    message: &str,
) -> Result<()> {
    if !args.publish {
        return Ok(());
    }

    let branch = args
        .branch
        .clone()
        .unwrap_or_else(|| site.default_branch().to_string());
    let publisher = publisher(site, token)?;
    apply_identity(site, &publisher)?;
    report(output, publisher.batch_commit_push(message, &branch), &branch)
}

fn report(output: &Output, outcome: PublishOutcome, branch: &str) -> Result<()> {
    match outcome {
        PublishOutcome::Published => {
            output.success(&format!("Published to {}", branch));
            Ok(())
        }
        PublishOutcome::Failed { stage, error } => {
            anyhow::bail!("Publishing stopped at {}: {}", stage, error)
        }
    }
}
