//! # Git Publishing
//!
//! Book pages only reach the live site once they are committed and pushed.
//! [`Publisher`] wraps the handful of git porcelain commands the admin tool
//! needs and chains them into add → commit → push.
//!
//! All git calls go through a [`GitRunner`], so tests can substitute a fake
//! and the real [`SystemGit`] runner applies a timeout to every call.
//!
//! ## Authenticated pushes
//!
//! With a token configured, a push to an `https://github.com/...` remote
//! temporarily rewrites the remote URL to `https://<token>@github.com/...`.
//! The original URL is restored when the push returns, whether it
//! succeeded or not.

mod publisher;
mod runner;

use thiserror::Error;

pub use publisher::{
    authenticated_url, LastCommit, PublishOutcome, PublishStage, Publisher, RepoStatus,
};
pub use runner::{GitRunner, SystemGit, DEFAULT_GIT_TIMEOUT};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GitError {
    #[error("git {command} failed: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("git {command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("git could not be run: {0}")]
    Unavailable(String),

    #[error("Not a git repository: {0}")]
    NotARepository(String),
}
