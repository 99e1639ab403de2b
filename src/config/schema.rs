//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the download proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Target validation and upstream header policy.
    pub policy: PolicyConfig,

    /// HTML link rewriting.
    pub rewrite: RewriteConfig,

    /// Landing page served at `/`.
    pub landing: LandingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
///
/// Both timeouts are unset by default: the proxy then relies on the hosting
/// environment's connection limits.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Outbound connection establishment timeout in seconds.
    pub connect_secs: Option<u64>,

    /// Time allowed until the response head is produced, in seconds.
    /// Streaming bodies are not cut off by this limit.
    pub request_secs: Option<u64>,
}

/// Behavior profile of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Single-host mirror: allow-list required, method forwarded,
    /// redirects handed back to the caller.
    Strict,

    /// General download proxy: redirects followed, every method sent as GET,
    /// full CORS header set.
    #[default]
    Permissive,
}

/// Target validation and upstream header policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Behavior profile.
    pub variant: Variant,

    /// Substrings of which at least one must appear in the target URL.
    /// Empty disables the check (not allowed for the strict variant).
    pub allowed_hosts: Vec<String>,

    /// Target URL prefixes for which inbound headers are forwarded verbatim.
    pub passthrough_prefixes: Vec<String>,

    /// User-Agent sent when neither `?ua=` nor the inbound request supply one.
    pub default_user_agent: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Permissive,
            allowed_hosts: Vec::new(),
            passthrough_prefixes: Vec::new(),
            default_user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// HTML link rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Rewrite upstream links in `text/html` responses.
    pub enabled: bool,

    /// Regex matching the upstream's public origin (scheme + host).
    pub pattern: String,

    /// Scheme used for the proxy's own origin in rewritten links.
    pub public_scheme: String,

    /// Host used in rewritten links. Falls back to the inbound `Host` header.
    pub public_host: Option<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: r"https?://(?:dl\.|www\.)?sourceforge\.net".to_string(),
            public_scheme: "https".to_string(),
            public_host: None,
        }
    }
}

/// Landing page configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LandingConfig {
    /// Page title and heading.
    pub title: String,

    /// Query parameter (`key=value`) the page appends to submitted links,
    /// e.g. `viasf=1` to skip SourceForge's interstitial.
    pub append_query: Option<String>,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            title: "Download Proxy".to_string(),
            append_query: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
