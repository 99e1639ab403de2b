//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject policies that would turn the strict variant into an open relay
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, Variant};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The listener address does not parse as `ip:port`.
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    /// The metrics address does not parse as `ip:port`.
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    /// A timeout of zero seconds was configured.
    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    /// The strict variant needs at least one allowed host.
    #[error("policy.allowed_hosts must not be empty for the strict variant")]
    OpenRelay,

    /// An allowed host entry is blank.
    #[error("policy.allowed_hosts contains an empty entry")]
    EmptyAllowedHost,

    /// A passthrough prefix is not an absolute `http(s)` URL prefix.
    #[error("policy.passthrough_prefixes entry `{0}` must start with http:// or https://")]
    PassthroughScheme(String),

    /// A passthrough prefix can never be reached because it fails the host allow-list.
    #[error("policy.passthrough_prefixes entry `{0}` does not match any allowed host")]
    UnreachablePassthrough(String),

    /// The default User-Agent is empty.
    #[error("policy.default_user_agent must not be empty")]
    EmptyUserAgent,

    /// The rewrite pattern does not compile.
    #[error("rewrite.pattern is not a valid regex: {0}")]
    RewritePattern(String),

    /// The rewrite scheme is not `http` or `https`.
    #[error("rewrite.public_scheme `{0}` must be http or https")]
    RewriteScheme(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    let policy = &config.policy;
    if policy.variant == Variant::Strict && policy.allowed_hosts.is_empty() {
        errors.push(ValidationError::OpenRelay);
    }
    if policy.allowed_hosts.iter().any(|h| h.trim().is_empty()) {
        errors.push(ValidationError::EmptyAllowedHost);
    }

    for prefix in &policy.passthrough_prefixes {
        if !prefix.starts_with("http://") && !prefix.starts_with("https://") {
            errors.push(ValidationError::PassthroughScheme(prefix.clone()));
        } else if !policy.allowed_hosts.is_empty()
            && !policy.allowed_hosts.iter().any(|h| prefix.contains(h.as_str()))
        {
            errors.push(ValidationError::UnreachablePassthrough(prefix.clone()));
        }
    }

    if policy.default_user_agent.trim().is_empty() {
        errors.push(ValidationError::EmptyUserAgent);
    }

    if config.rewrite.enabled {
        if let Err(e) = regex::bytes::Regex::new(&config.rewrite.pattern) {
            errors.push(ValidationError::RewritePattern(e.to_string()));
        }
        if !matches!(config.rewrite.public_scheme.as_str(), "http" | "https") {
            errors.push(ValidationError::RewriteScheme(
                config.rewrite.public_scheme.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn test_strict_requires_allow_list() {
        let mut config = ProxyConfig::default();
        config.policy.variant = Variant::Strict;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::OpenRelay]);

        config.policy.allowed_hosts.push("dl.sourceforge.net".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.timeouts.request_secs = Some(0);
        config.rewrite.enabled = true;
        config.rewrite.pattern = "(unclosed".into();
        config.rewrite.public_scheme = "ftp".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroTimeout("request_secs")));
        assert!(errors.contains(&ValidationError::RewriteScheme("ftp".into())));
    }

    #[test]
    fn test_passthrough_prefix_checks() {
        let mut config = ProxyConfig::default();
        config.policy.allowed_hosts = vec!["dl.sourceforge.net".into()];
        config.policy.passthrough_prefixes = vec![
            "dl.sourceforge.net/project/".into(),
            "https://downloads.sourceforge.net/project/ababa/".into(),
            "https://dl.sourceforge.net/project/ababa/".into(),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::PassthroughScheme("dl.sourceforge.net/project/".into()),
                ValidationError::UnreachablePassthrough(
                    "https://downloads.sourceforge.net/project/ababa/".into()
                ),
            ]
        );
    }

    #[test]
    fn test_disabled_rewrite_skips_pattern_check() {
        let mut config = ProxyConfig::default();
        config.rewrite.enabled = false;
        config.rewrite.pattern = "(".into();
        assert!(validate_config(&config).is_ok());
    }
}
