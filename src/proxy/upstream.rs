//! Outbound fetch to the target.
//!
//! # Responsibilities
//! - Own the `reqwest` client for one configuration generation
//! - Build exactly one outbound request per proxied request
//! - Apply the header policy chosen by [`Policy::header_mode`]
//!
//! # Design Decisions
//! - Redirect handling is a client property, so the client is rebuilt on reload
//! - No inbound body is ever forwarded
//! - No retries: a failed attempt is surfaced to the caller immediately

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Method};
use reqwest::{redirect, Client, RequestBuilder, Response};

use crate::config::TimeoutConfig;
use crate::proxy::policy::{HeaderMode, Policy};
use crate::proxy::target::Target;
use crate::proxy::user_agent;

/// Maximum redirect hops when the fetch layer follows redirects.
pub const MAX_REDIRECTS: usize = 10;

/// Headers scoped to the inbound connection, never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// HTTP client for upstream fetches.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
}

impl Upstream {
    /// Build the client for a policy and timeout configuration.
    pub fn new(policy: &Policy, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let redirects = if policy.follows_redirects() {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        };

        let mut builder = Client::builder().redirect(redirects);
        if let Some(secs) = timeouts.connect_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Prepare the outbound request for a validated target.
    ///
    /// `strip_encoding` drops a forwarded `Accept-Encoding` so that HTML
    /// bodies arrive in a form that can be rewritten.
    pub fn request(
        &self,
        policy: &Policy,
        target: &Target,
        method: &Method,
        inbound: &HeaderMap,
        strip_encoding: bool,
    ) -> RequestBuilder {
        let headers = match policy.header_mode(target.url()) {
            HeaderMode::Passthrough => passthrough_headers(inbound, strip_encoding),
            HeaderMode::Minimal => minimal_headers(policy, target, inbound),
        };

        // An unparseable URL surfaces as an error from `send`.
        self.client
            .request(policy.outbound_method(method), target.url())
            .headers(headers)
    }

    /// Send the outbound request.
    pub async fn fetch(
        &self,
        policy: &Policy,
        target: &Target,
        method: &Method,
        inbound: &HeaderMap,
        strip_encoding: bool,
    ) -> Result<Response, reqwest::Error> {
        self.request(policy, target, method, inbound, strip_encoding)
            .send()
            .await
    }
}

/// Headers for [`HeaderMode::Minimal`]: the resolved User-Agent and, for the
/// permissive variant, the inbound `Accept`.
pub fn minimal_headers(policy: &Policy, target: &Target, inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let ua = user_agent::resolve(target.user_agent(), policy.default_user_agent());
    match HeaderValue::from_str(ua) {
        Ok(value) => {
            headers.insert(header::USER_AGENT, value);
        }
        Err(_) => {
            tracing::debug!(user_agent = %ua, "Unusable User-Agent override, sending default");
            if let Ok(value) = HeaderValue::from_str(policy.default_user_agent()) {
                headers.insert(header::USER_AGENT, value);
            }
        }
    }

    if policy.forwards_accept() {
        let accept = inbound
            .get(header::ACCEPT)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("*/*"));
        headers.insert(header::ACCEPT, accept);
    }

    headers
}

/// Headers for [`HeaderMode::Passthrough`]: the inbound set minus `Host` and
/// hop-by-hop headers.
pub fn passthrough_headers(inbound: &HeaderMap, strip_encoding: bool) -> HeaderMap {
    let mut headers = inbound.clone();

    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    if strip_encoding {
        headers.remove(header::ACCEPT_ENCODING);
    }

    headers
}
