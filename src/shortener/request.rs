//! Structured HTTP requests derived from command templates
//!
//! Platform templates are written as `curl` invocations. When a template
//! has the simple shape `curl -X POST "<endpoint>" -d "<k=v&k=v>"` it is
//! turned into an endpoint plus a form parameter list, and placeholders are
//! substituted per parameter value. Templates that carry headers, JSON
//! bodies, several payloads or a non-POST method are rejected.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;

use super::ShortenError;
use crate::domain::{API_KEY_PLACEHOLDER, LINK_PLACEHOLDER};

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("static regex"));

static DATA_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)(?:-d|--data)\s+"([^"]*)""#).expect("static regex")
});

static METHOD_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)(?:-X|--request)\s+"?([A-Za-z]+)"?"#).expect("static regex")
});

/// Flags whose presence puts a template outside the supported shape
const UNSUPPORTED_FLAGS: &[&str] = &["-H", "--header", "--json", "--data-raw", "--data-binary", "-F", "--form"];

/// Values substituted into a request
#[derive(Debug, Clone, Copy)]
pub struct Substitutions<'a> {
    pub link: &'a str,
    pub api_key: Option<&'a str>,
}

impl Substitutions<'_> {
    fn apply(&self, text: &str) -> String {
        let rendered = text.replace(LINK_PLACEHOLDER, self.link);
        match self.api_key {
            Some(key) => rendered.replace(API_KEY_PLACEHOLDER, key),
            None => rendered,
        }
    }
}

/// A form-encoded POST to a shortening endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub endpoint: String,
    pub form: Vec<(String, String)>,
}

impl HttpRequest {
    /// Parses a `curl` template into a request description
    pub fn from_template(template: &str) -> Result<Self, ShortenError> {
        let unsupported = |reason: &str| ShortenError::UnsupportedTemplate(reason.to_string());

        if !template.trim_start().starts_with("curl ") {
            return Err(unsupported("not a curl command"));
        }

        if template
            .split_whitespace()
            .any(|token| UNSUPPORTED_FLAGS.contains(&token))
        {
            return Err(unsupported("headers, JSON bodies and multipart forms are not supported"));
        }

        if let Some(caps) = METHOD_FLAG.captures(template) {
            if !caps[1].eq_ignore_ascii_case("POST") {
                return Err(unsupported("only POST requests are supported"));
            }
        }

        let payloads: Vec<_> = DATA_FLAG.captures_iter(template).collect();
        let payload = match payloads.as_slice() {
            [single] => single,
            [] => return Err(unsupported("missing -d payload")),
            _ => return Err(unsupported("multiple -d payloads")),
        };
        let payload_span = payload
            .get(1)
            .map(|m| m.range())
            .ok_or_else(|| unsupported("missing -d payload"))?;

        let endpoint = QUOTED
            .captures_iter(template)
            .filter_map(|caps| caps.get(1))
            .filter(|m| m.range() != payload_span)
            .map(|m| m.as_str())
            .find(|s| s.starts_with("http://") || s.starts_with("https://"))
            .ok_or_else(|| unsupported("no quoted endpoint URL"))?
            .to_string();

        let form = payload[1]
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(Self { endpoint, form })
    }

    /// Substitutes placeholders in the endpoint and every parameter value
    pub fn render(&self, subs: Substitutions<'_>) -> Self {
        Self {
            endpoint: subs.apply(&self.endpoint),
            form: self
                .form
                .iter()
                .map(|(k, v)| (k.clone(), subs.apply(v)))
                .collect(),
        }
    }

    /// Sends the request and returns the response body
    pub fn send(&self, timeout: Duration) -> Result<String, ShortenError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ShortenError::Http(e.to_string()))?;

        tracing::debug!(endpoint = %self.endpoint, params = self.form.len(), "sending shorten request");

        let response = client
            .post(&self.endpoint)
            .form(&self.form)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                if e.is_timeout() {
                    ShortenError::Timeout(timeout.as_secs())
                } else {
                    ShortenError::Http(e.to_string())
                }
            })?;

        response.text().map_err(|e| ShortenError::Http(e.to_string()))
    }
}
