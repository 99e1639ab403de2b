//! Target URL extraction.
//!
//! The path of every non-root request carries a percent-encoded absolute URL,
//! e.g. `/https%3A%2F%2Fdl.sourceforge.net%2Fproject%2Ffoo.zip?ua=...`. The
//! proxy's own query string (`ua`) is never part of the target.

use axum::http::{header, request::Parts};
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Query parameter carrying a User-Agent override.
pub const UA_PARAM: &str = "ua";

/// Reasons a request path does not name an acceptable target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The path does not percent-decode to UTF-8.
    #[error("invalid download link: not valid percent-encoded UTF-8")]
    Encoding,

    /// The decoded target is not an `http(s)` URL.
    #[error("invalid download link: must start with http:// or https://")]
    Scheme,

    /// The decoded target does not mention any allowed host.
    #[error("invalid download link: host is not allowed")]
    HostNotAllowed,
}

/// A decoded, not yet validated, download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: String,
    user_agent: Option<String>,
}

impl Target {
    /// Extract the target from the request path, and the User-Agent override
    /// from `?ua=` or, failing that, the inbound `User-Agent` header.
    pub fn from_parts(parts: &Parts) -> Result<Self, TargetError> {
        let url = decode_path(parts.uri.path())?;

        let user_agent = parts
            .uri
            .query()
            .and_then(ua_param)
            .or_else(|| {
                parts
                    .headers
                    .get(header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(str::to_owned)
            });

        Ok(Self { url, user_agent })
    }

    /// Build a target directly from a decoded URL.
    pub fn new(url: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            url: url.into(),
            user_agent,
        }
    }

    /// The decoded target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The requested User-Agent, if any.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

/// Percent-decode everything after the leading `/` of a request path.
pub fn decode_path(path: &str) -> Result<String, TargetError> {
    let encoded = path.strip_prefix('/').unwrap_or(path);

    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| TargetError::Encoding)
}

/// Check that a decoded target is an `http(s)` URL.
pub fn check_scheme(url: &str) -> Result<(), TargetError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(TargetError::Scheme)
    }
}

/// Read the last non-empty `ua` parameter from a query string.
fn ua_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, value)| key == UA_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
        .last()
}
