//! Per-deployment proxy policy.
//!
//! # Responsibilities
//! - Decide whether a decoded target may be fetched at all
//! - Decide which inbound headers accompany the outbound request
//! - Describe variant-specific behavior (redirects, method, CORS)
//!
//! # Design Decisions
//! - Allow-list entries are substrings of the full target URL
//! - Passthrough is opt-in per URL prefix and never the default
//! - Policy is immutable; reloads build a new one

use axum::http::{header, HeaderName, Method};

use crate::config::{PolicyConfig, Variant};
use crate::proxy::target::{check_scheme, TargetError};

/// Which inbound headers are sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// Only the resolved User-Agent (and `Accept` for the permissive variant).
    Minimal,
    /// Inbound headers verbatim, minus `Host` and hop-by-hop headers.
    Passthrough,
}

static STRICT_CORS: &[(HeaderName, &str)] = &[(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")];

static DOWNLOAD_CORS: &[(HeaderName, &str)] = &[
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

/// Compiled policy for one configuration generation.
#[derive(Debug, Clone)]
pub struct Policy {
    variant: Variant,
    allowed_hosts: Vec<String>,
    passthrough_prefixes: Vec<String>,
    default_user_agent: String,
}

impl Policy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            variant: config.variant,
            allowed_hosts: config.allowed_hosts.clone(),
            passthrough_prefixes: config.passthrough_prefixes.clone(),
            default_user_agent: config.default_user_agent.clone(),
        }
    }

    /// Substrings a target must contain. Empty means any `http(s)` target.
    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Validate a decoded target URL. Must pass before any network call.
    pub fn check(&self, url: &str) -> Result<(), TargetError> {
        check_scheme(url)?;

        if self.allowed_hosts.is_empty()
            || self.allowed_hosts.iter().any(|host| url.contains(host.as_str()))
        {
            Ok(())
        } else {
            Err(TargetError::HostNotAllowed)
        }
    }

    pub fn header_mode(&self, url: &str) -> HeaderMode {
        if self
            .passthrough_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
        {
            HeaderMode::Passthrough
        } else {
            HeaderMode::Minimal
        }
    }

    pub fn default_user_agent(&self) -> &str {
        &self.default_user_agent
    }

    /// Whether the fetch layer follows upstream redirects itself.
    pub fn follows_redirects(&self) -> bool {
        self.variant == Variant::Permissive
    }

    /// Method used for the outbound request.
    pub fn outbound_method(&self, inbound: &Method) -> Method {
        match self.variant {
            Variant::Strict => inbound.clone(),
            Variant::Permissive => Method::GET,
        }
    }

    /// Whether `Accept` is forwarded in [`HeaderMode::Minimal`].
    pub fn forwards_accept(&self) -> bool {
        self.variant == Variant::Permissive
    }

    /// CORS headers set on every proxied response.
    pub fn cors_headers(&self) -> &'static [(HeaderName, &'static str)] {
        match self.variant {
            Variant::Strict => STRICT_CORS,
            Variant::Permissive => DOWNLOAD_CORS,
        }
    }
}
