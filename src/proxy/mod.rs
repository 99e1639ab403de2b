//! Download proxying subsystem.
//!
//! # Data Flow
//! ```text
//! GET /<percent-encoded URL>[?ua=...]
//!     → target.rs (decode path, pick User-Agent)
//!     → policy.rs (scheme + allow-list, header mode)
//!     → upstream.rs (single outbound request)
//!     → adapt.rs (CORS, Content-Disposition, HTML link rewrite)
//!     → handler.rs (ties it together, maps errors to responses)
//! ```
//!
//! # Design Decisions
//! - Validation happens before any network call
//! - A [`Runtime`] is built per configuration generation and never mutated
//! - No retries, no caching, no state between requests

pub mod adapt;
pub mod error;
pub mod handler;
pub mod link;
pub mod policy;
pub mod target;
pub mod upstream;
pub mod user_agent;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::landing;

pub use adapt::{ContentKind, HtmlRewriter};
pub use error::ProxyError;
pub use handler::{handle, Outcome};
pub use link::proxy_link;
pub use policy::{HeaderMode, Policy};
pub use target::{Target, TargetError};
pub use upstream::Upstream;

/// Error building a [`Runtime`] from configuration.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to render landing page: {0}")]
    Landing(#[from] serde_json::Error),
}

/// Everything a request needs, compiled from one [`ProxyConfig`].
#[derive(Debug)]
pub struct Runtime {
    pub policy: Policy,
    pub upstream: Upstream,
    pub rewriter: Option<HtmlRewriter>,
    /// Landing page rendered for this policy.
    pub landing: String,
}

impl Runtime {
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RuntimeError> {
        let policy = Policy::from_config(&config.policy);
        let upstream = Upstream::new(&policy, &config.timeouts)?;
        let rewriter = HtmlRewriter::from_config(&config.rewrite)?;
        let landing = landing::render(&policy, &config.landing)?;

        Ok(Self {
            policy,
            upstream,
            rewriter,
            landing,
        })
    }
}
