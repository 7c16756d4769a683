use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::process::{run_with_timeout, ProcessError, ProcessOutput};

use super::GitError;

/// Timeout applied to each git invocation
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Executes git commands inside a working copy
///
/// Implementations return the captured output for any exit code; deciding
/// whether a non-zero exit is an error is up to the caller.
pub trait GitRunner {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<ProcessOutput, GitError>;
}

/// Runs the `git` binary found on `PATH`
#[derive(Debug, Clone)]
pub struct SystemGit {
    timeout: Duration,
}

impl SystemGit {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT)
    }
}

impl GitRunner for SystemGit {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<ProcessOutput, GitError> {
        let mut command = Command::new("git");
        command.args(args).current_dir(repo);

        run_with_timeout(command, self.timeout).map_err(|e| match e {
            ProcessError::Timeout(limit) => GitError::Timeout {
                command: args.first().copied().unwrap_or_default().to_string(),
                secs: limit.as_secs(),
            },
            other => GitError::Unavailable(other.to_string()),
        })
    }
}
