//! The proxied request pipeline.
//!
//! ```text
//! request path
//!     → Target::from_parts (decode)
//!     → Policy::check (scheme + allow-list)        ✗ → 400
//!     → Upstream::fetch (one outbound request)     ✗ → 500
//!     → redirect?        → hand back as-is
//!     → error status?    → pass through
//!     → HTML + rewriter? → buffer, rewrite links
//!     → otherwise        → stream, add Content-Disposition
//! ```

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::adapt::{
    content_disposition, file_name_from_url, is_forwarded_redirect, strip_body_headers,
    strip_connection_headers, ContentKind,
};
use crate::proxy::error::ProxyError;
use crate::proxy::target::Target;
use crate::proxy::Runtime;

/// Which branch a request took. Each request ends in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Landing,
    Rejected,
    Redirect,
    Html,
    Download,
    UpstreamStatus,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Landing => "landing",
            Outcome::Rejected => "rejected",
            Outcome::Redirect => "redirect",
            Outcome::Html => "html",
            Outcome::Download => "download",
            Outcome::UpstreamStatus => "upstream_status",
            Outcome::Failed => "failed",
        }
    }
}

/// Run one proxied request to completion. Never fails: errors become responses.
pub async fn handle(runtime: &Runtime, request: Request<Body>) -> (Outcome, Response) {
    let (parts, _body) = request.into_parts();

    match proxy(runtime, &parts).await {
        Ok(done) => done,
        Err(err) => {
            let outcome = match err {
                ProxyError::InvalidTarget(ref reason) => {
                    tracing::info!(path = %parts.uri.path(), reason = %reason, "Rejected target");
                    Outcome::Rejected
                }
                ProxyError::Upstream(ref e) => {
                    tracing::warn!(error = %e, "Upstream request failed");
                    crate::observability::metrics::record_upstream_failure();
                    Outcome::Failed
                }
            };
            (outcome, err.into_response())
        }
    }
}

async fn proxy(runtime: &Runtime, parts: &Parts) -> Result<(Outcome, Response), ProxyError> {
    let target = Target::from_parts(parts)?;
    runtime.policy.check(target.url())?;

    tracing::debug!(
        target = %target.url(),
        mode = ?runtime.policy.header_mode(target.url()),
        "Fetching upstream"
    );

    let upstream = runtime
        .upstream
        .fetch(
            &runtime.policy,
            &target,
            &parts.method,
            &parts.headers,
            runtime.rewriter.is_some(),
        )
        .await
        .map_err(ProxyError::Upstream)?;

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_connection_headers(&mut headers);
    for (name, value) in runtime.policy.cors_headers() {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }

    if is_forwarded_redirect(status) && !runtime.policy.follows_redirects() {
        tracing::debug!(status = %status, location = ?headers.get(header::LOCATION), "Forwarding redirect");
        return Ok((Outcome::Redirect, stream(status, headers, upstream)));
    }

    if !status.is_success() {
        tracing::debug!(status = %status, "Passing upstream status through");
        return Ok((Outcome::UpstreamStatus, stream(status, headers, upstream)));
    }

    match (ContentKind::of(&headers), &runtime.rewriter) {
        (ContentKind::Html, Some(rewriter)) => {
            let body = upstream.bytes().await.map_err(ProxyError::Upstream)?;

            let body = match rewriter.origin(request_host(parts)) {
                Some(origin) => rewriter.rewrite(&body, &origin).into_owned(),
                None => {
                    tracing::warn!("No host to rewrite links to, returning page unchanged");
                    body.to_vec()
                }
            };
            strip_body_headers(&mut headers);

            Ok((Outcome::Html, build(status, headers, Body::from(body))))
        }
        _ => {
            if !headers.contains_key(header::CONTENT_DISPOSITION) {
                let file_name = file_name_from_url(target.url());
                headers.insert(header::CONTENT_DISPOSITION, content_disposition(&file_name));
            }
            Ok((Outcome::Download, stream(status, headers, upstream)))
        }
    }
}

/// The host the request was addressed to.
fn request_host(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
}

fn stream(status: StatusCode, headers: HeaderMap, upstream: reqwest::Response) -> Response {
    build(status, headers, Body::from_stream(upstream.bytes_stream()))
}

fn build(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
