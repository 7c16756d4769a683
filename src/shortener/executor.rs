//! Shortening executor
//!
//! Renders a platform's command template, runs it (as a shell command or as
//! a direct HTTP request), extracts the short URL from the response and
//! validates it. Failures never escape [`Shorten::shorten`]: they come back
//! as [`ShortenOutcome::Fallback`] carrying the original URL and the reason.

use std::process::Command;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::request::{HttpRequest, Substitutions};
use super::response::{extract, is_valid_url};
use super::ShortenError;
use crate::domain::{Platform, API_KEY_PLACEHOLDER, LINK_PLACEHOLDER};
use crate::process::{run_with_timeout, ProcessError};

/// Default timeout for one shortening call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// URL used when testing a platform without an explicit sample
pub const DEFAULT_SAMPLE_URL: &str = "https://www.google.com";

/// Exit status shells use for "command not found"
const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// How rendered templates are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Simple curl templates go through the HTTP client, everything else
    /// runs in the shell
    #[default]
    Auto,

    /// Always run the shell, using HTTP only when the command is unavailable
    Command,

    /// Only structured HTTP requests
    Http,
}

/// Result of a shortening attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ShortenOutcome {
    /// The service returned a valid short URL
    Shortened { url: String },

    /// Shortening failed; `url` is the original long URL
    Fallback { url: String, error: ShortenError },
}

impl ShortenOutcome {
    /// The URL to use, shortened or not
    pub fn url(&self) -> &str {
        match self {
            ShortenOutcome::Shortened { url } | ShortenOutcome::Fallback { url, .. } => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            ShortenOutcome::Shortened { url } | ShortenOutcome::Fallback { url, .. } => url,
        }
    }

    pub fn is_shortened(&self) -> bool {
        matches!(self, ShortenOutcome::Shortened { .. })
    }

    pub fn error(&self) -> Option<&ShortenError> {
        match self {
            ShortenOutcome::Shortened { .. } => None,
            ShortenOutcome::Fallback { error, .. } => Some(error),
        }
    }
}

/// Report produced by [`Shortener::test`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTest {
    pub success: bool,
    pub short_url: String,
    pub error: Option<String>,
    /// Wall-clock seconds, rounded to two decimals
    pub response_time: f64,
}

/// Anything that can shorten a URL through a platform
pub trait Shorten {
    fn shorten(&self, long_url: &str, platform: &Platform) -> ShortenOutcome;
}

/// Executes platform templates
#[derive(Debug, Clone)]
pub struct Shortener {
    timeout: Duration,
    http_timeout: Duration,
    transport: Transport,
}

impl Default for Shortener {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, Transport::Auto)
    }
}

impl Shortener {
    pub fn new(timeout: Duration, transport: Transport) -> Self {
        Self {
            timeout,
            http_timeout: timeout,
            transport,
        }
    }

    /// Uses a separate timeout for direct HTTP requests
    pub fn with_http_timeout(mut self, http_timeout: Duration) -> Self {
        self.http_timeout = http_timeout;
        self
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Shortens `long_url`, reporting failures as errors
    pub fn try_shorten(&self, long_url: &str, platform: &Platform) -> Result<String, ShortenError> {
        let api_key = resolve_api_key(platform)?;
        let subs = Substitutions { link: long_url, api_key };
        let rendered = render_template(&platform.curl_template, subs);

        let output = match self.transport {
            Transport::Http => self.send_http(&platform.curl_template, subs)?,
            Transport::Command => match run_command(&rendered, self.timeout) {
                Err(ShortenError::CommandUnavailable(reason)) => {
                    debug!(platform = %platform.name, %reason, "command unavailable, using HTTP");
                    self.send_http(&platform.curl_template, subs)?
                }
                other => other?,
            },
            Transport::Auto => match HttpRequest::from_template(&platform.curl_template) {
                Ok(request) => request.render(subs).send(self.http_timeout)?,
                Err(_) => run_command(&rendered, self.timeout)?,
            },
        };

        let short_url = extract(&output, platform.response_format, &platform.response_path)?;
        if short_url.is_empty() || !is_valid_url(&short_url) {
            return Err(ShortenError::InvalidUrl(truncate(&short_url, 200)));
        }

        Ok(short_url)
    }

    fn send_http(&self, template: &str, subs: Substitutions<'_>) -> Result<String, ShortenError> {
        HttpRequest::from_template(template)?
            .render(subs)
            .send(self.http_timeout)
    }

    /// Shortens `sample_url` and reports whether the platform works
    pub fn test(&self, platform: &Platform, sample_url: &str) -> PlatformTest {
        let started = Instant::now();
        let outcome = self.shorten(sample_url, platform);
        let elapsed = started.elapsed().as_secs_f64();

        let success = outcome.is_shortened() && outcome.url() != sample_url;
        let error = match outcome.error() {
            Some(e) => Some(e.to_string()),
            None if !success => Some("URL was not shortened (returned original URL)".to_string()),
            None => None,
        };

        PlatformTest {
            success,
            short_url: outcome.into_url(),
            error,
            response_time: (elapsed * 100.0).round() / 100.0,
        }
    }
}

impl Shorten for Shortener {
    fn shorten(&self, long_url: &str, platform: &Platform) -> ShortenOutcome {
        match self.try_shorten(long_url, platform) {
            Ok(url) => {
                debug!(platform = %platform.name, short = %url, "shortened");
                ShortenOutcome::Shortened { url }
            }
            Err(error) => {
                warn!(platform = %platform.name, %error, "shortening failed, keeping original URL");
                ShortenOutcome::Fallback {
                    url: long_url.to_string(),
                    error,
                }
            }
        }
    }
}

fn resolve_api_key(platform: &Platform) -> Result<Option<&str>, ShortenError> {
    if !platform.needs_api_key() {
        return Ok(None);
    }

    match platform.api_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Some(key)),
        _ => Err(ShortenError::MissingApiKey(platform.name.clone())),
    }
}

/// Substitutes placeholders into the whole template text
pub fn render_template(template: &str, subs: Substitutions<'_>) -> String {
    let rendered = template.replace(LINK_PLACEHOLDER, subs.link);
    match subs.api_key {
        Some(key) => rendered.replace(API_KEY_PLACEHOLDER, key),
        None => rendered,
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

fn shell_command(script: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(script);
        cmd
    }

    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }
}

/// Runs a rendered template in the shell and returns its stdout
pub fn run_command(script: &str, timeout: Duration) -> Result<String, ShortenError> {
    let output = run_with_timeout(shell_command(script), timeout).map_err(|e| match e {
        ProcessError::Timeout(limit) => ShortenError::Timeout(limit.as_secs()),
        other => ShortenError::CommandUnavailable(other.to_string()),
    })?;

    let stderr = output.stderr.trim().to_string();
    match output.code {
        Some(0) => Ok(output.stdout),
        Some(EXIT_COMMAND_NOT_FOUND) => Err(ShortenError::CommandUnavailable(stderr)),
        code => Err(ShortenError::CommandFailed { code, stderr }),
    }
}
