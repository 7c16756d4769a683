use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::process::ProcessOutput;

use super::{GitError, GitRunner, SystemGit};

const GITHUB_HTTPS: &str = "https://github.com/";

/// Step of a publish at which it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStage {
    Add,
    Commit,
    Push,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishStage::Add => write!(f, "add"),
            PublishStage::Commit => write!(f, "commit"),
            PublishStage::Push => write!(f, "push"),
        }
    }
}

/// Result of add → commit → push
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Published,
    Failed { stage: PublishStage, error: GitError },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastCommit {
    /// First 8 characters of the commit hash
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

/// Snapshot of the working copy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoStatus {
    pub current_branch: String,
    pub has_changes: bool,
    pub last_commit: Option<LastCommit>,
    pub remote_url: Option<String>,
    pub repo_path: PathBuf,
}

/// Rewrites a GitHub HTTPS remote to carry `token`
///
/// Returns `None` for any other kind of remote.
pub fn authenticated_url(url: &str, token: &str) -> Option<String> {
    url.strip_prefix(GITHUB_HTTPS)
        .map(|rest| format!("https://{}@github.com/{}", token, rest))
}

/// Git operations on a site's working copy
pub struct Publisher<R: GitRunner = SystemGit> {
    repo: PathBuf,
    remote: String,
    token: Option<String>,
    runner: R,
}

impl<R: GitRunner> Publisher<R> {
    pub fn new(repo: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            repo: repo.into(),
            remote: "origin".to_string(),
            token: None,
            runner,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Token embedded in the remote URL while pushing
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn describe(&self, args: &[&str]) -> String {
        let line = args.join(" ");
        match &self.token {
            Some(token) => line.replace(token.as_str(), "***"),
            None => line,
        }
    }

    /// Runs one git command
    ///
    /// With `check`, a non-zero exit becomes [`GitError::CommandFailed`];
    /// without it the output is returned as is.
    pub fn git(&self, args: &[&str], check: bool) -> Result<ProcessOutput, GitError> {
        let command = self.describe(args);
        debug!(repo = %self.repo.display(), "git {}", command);

        let output = self.runner.run(&self.repo, args)?;
        if check && !output.success() {
            return Err(GitError::CommandFailed {
                command,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }

    fn git_stdout(&self, args: &[&str]) -> Result<String, GitError> {
        Ok(self.git(args, true)?.stdout.trim().to_string())
    }

    /// Fails unless the directory is inside a git working copy
    pub fn ensure_repository(&self) -> Result<(), GitError> {
        let output = self.git(&["rev-parse", "--is-inside-work-tree"], false)?;
        if output.success() && output.stdout.trim() == "true" {
            Ok(())
        } else {
            Err(GitError::NotARepository(self.repo.display().to_string()))
        }
    }

    /// Stages a path (relative to the repository root or absolute)
    pub fn add(&self, path: &Path) -> Result<(), GitError> {
        let path = path.strip_prefix(&self.repo).unwrap_or(path);
        let path = path.to_string_lossy();
        self.git(&["add", "--", &*path], true)?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<(), GitError> {
        self.git(&["add", "."], true)?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.git(&["commit", "-m", message], true)?;
        info!(message, "committed");
        Ok(())
    }

    /// Pushes `branch`, authenticating with the token when one is set
    pub fn push(&self, branch: &str) -> Result<(), GitError> {
        let _guard = match &self.token {
            Some(token) => self.authenticate_remote(token)?,
            None => None,
        };

        self.git(&["push", &self.remote, branch], true)?;
        info!(remote = %self.remote, branch, "pushed");
        Ok(())
    }

    fn authenticate_remote(&self, token: &str) -> Result<Option<RemoteGuard<'_, R>>, GitError> {
        let original = self.git_stdout(&["remote", "get-url", &self.remote])?;
        let Some(authenticated) = authenticated_url(&original, token) else {
            debug!(remote = %self.remote, "remote is not a GitHub HTTPS URL, pushing without token");
            return Ok(None);
        };

        self.git(&["remote", "set-url", &self.remote, &authenticated], true)?;
        Ok(Some(RemoteGuard {
            publisher: self,
            original,
        }))
    }

    pub fn pull(&self, branch: &str) -> Result<(), GitError> {
        self.git(&["pull", &self.remote, branch], true)?;
        info!(remote = %self.remote, branch, "pulled");
        Ok(())
    }

    /// Creates `name` and switches to it
    pub fn create_branch(&self, name: &str) -> Result<(), GitError> {
        self.git(&["checkout", "-b", name], true)?;
        Ok(())
    }

    pub fn switch_branch(&self, name: &str) -> Result<(), GitError> {
        self.git(&["checkout", name], true)?;
        Ok(())
    }

    /// Local and remote branch names, without the current-branch line
    pub fn list_branches(&self) -> Result<Vec<String>, GitError> {
        let stdout = self.git_stdout(&["branch", "-a"])?;
        let remote_prefix = format!("remotes/{}/", self.remote);

        let mut branches: Vec<String> = Vec::new();
        for line in stdout.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('*') || line.contains(" -> ") {
                continue;
            }
            let name = line.strip_prefix(&remote_prefix).unwrap_or(line);
            if !branches.iter().any(|b| b == name) {
                branches.push(name.to_string());
            }
        }

        Ok(branches)
    }

    pub fn current_branch(&self) -> Result<String, GitError> {
        self.git_stdout(&["symbolic-ref", "--short", "HEAD"])
    }

    pub fn status(&self) -> Result<RepoStatus, GitError> {
        let current_branch = self.current_branch()?;
        let has_changes = !self.git_stdout(&["status", "--porcelain"])?.is_empty();

        let log = self.git(&["log", "-1", "--format=%H%n%an%n%aI%n%s"], false)?;
        let last_commit = if log.success() {
            parse_last_commit(&log.stdout)
        } else {
            None
        };

        let remote = self.git(&["remote", "get-url", &self.remote], false)?;
        let remote_url = remote
            .success()
            .then(|| remote.stdout.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(RepoStatus {
            current_branch,
            has_changes,
            last_commit,
            remote_url,
            repo_path: self.repo.clone(),
        })
    }

    /// Sets the repository-local commit identity
    pub fn configure_identity(&self, name: &str, email: &str) -> Result<(), GitError> {
        self.git(&["config", "user.name", name], true)?;
        self.git(&["config", "user.email", email], true)?;
        Ok(())
    }

    /// Stages one file, commits it and pushes
    pub fn add_commit_push(&self, file: &Path, message: &str, branch: &str) -> PublishOutcome {
        self.publish(|| self.add(file), message, branch)
    }

    /// Stages everything, commits and pushes
    pub fn batch_commit_push(&self, message: &str, branch: &str) -> PublishOutcome {
        self.publish(|| self.add_all(), message, branch)
    }

    fn publish(
        &self,
        stage: impl FnOnce() -> Result<(), GitError>,
        message: &str,
        branch: &str,
    ) -> PublishOutcome {
        let result = stage()
            .map_err(|e| (PublishStage::Add, e))
            .and_then(|_| self.commit(message).map_err(|e| (PublishStage::Commit, e)))
            .and_then(|_| self.push(branch).map_err(|e| (PublishStage::Push, e)));

        match result {
            Ok(()) => PublishOutcome::Published,
            Err((stage, error)) => {
                warn!(%stage, %error, "publish stopped");
                PublishOutcome::Failed { stage, error }
            }
        }
    }
}

fn parse_last_commit(stdout: &str) -> Option<LastCommit> {
    let mut lines = stdout.lines();
    let hash = lines.next()?.trim();
    if hash.is_empty() {
        return None;
    }

    Some(LastCommit {
        hash: hash.chars().take(8).collect(),
        author: lines.next().unwrap_or_default().to_string(),
        date: lines.next().unwrap_or_default().to_string(),
        message: lines.next().unwrap_or_default().to_string(),
    })
}

/// Restores the remote URL when dropped
struct RemoteGuard<'a, R: GitRunner> {
    publisher: &'a Publisher<R>,
    original: String,
}

impl<R: GitRunner> Drop for RemoteGuard<'_, R> {
    fn drop(&mut self) {
        let remote = self.publisher.remote.as_str();
        match self
            .publisher
            .git(&["remote", "set-url", remote, &self.original], true)
        {
            Ok(_) => debug!(remote, "restored remote URL"),
            Err(error) => warn!(remote, %error, "failed to restore remote URL"),
        }
    }
}
