//! # URL Shortening
//!
//! Platforms are described declaratively (see [`crate::domain::Platform`]):
//! a command template containing `${link_download}`, a response format and
//! an optional JSON path. This module turns such a description into an
//! actual call.
//!
//! ## Execution
//!
//! | Transport | Behaviour |
//! |-----------|-----------|
//! | `auto` | simple `curl` POST templates go through the HTTP client, others run in the shell |
//! | `command` | shell only; HTTP when the command cannot be started |
//! | `http` | structured HTTP only |
//!
//! Every call is bounded by a timeout (30 seconds by default). A failed
//! call yields [`ShortenOutcome::Fallback`] with the original URL, so
//! callers always have a usable link and can still tell the two apart.

mod executor;
mod request;
mod response;

use thiserror::Error;

pub use executor::{
    render_template, run_command, PlatformTest, Shorten, ShortenOutcome, Shortener, Transport,
    DEFAULT_SAMPLE_URL, DEFAULT_TIMEOUT,
};
pub use request::{HttpRequest, Substitutions};
pub use response::{extract, is_valid_url, COMMON_URL_FIELDS};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShortenError {
    #[error("API key required for {0}")]
    MissingApiKey(String),

    #[error("Command could not be run: {0}")]
    CommandUnavailable(String),

    #[error("Command exited with {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Unsupported command template: {0}")]
    UnsupportedTemplate(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Path '{0}' not found in response")]
    PathNotFound(String),

    #[error("Could not find short URL in JSON response")]
    NoUrlField,

    #[error("Response is not a valid URL: {0}")]
    InvalidUrl(String),
}
