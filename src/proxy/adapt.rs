//! Response adaptation.
//!
//! # Responsibilities
//! - Classify upstream responses (redirect, HTML, everything else)
//! - Rewrite upstream links in HTML bodies to point back at the proxy
//! - Synthesize `Content-Disposition` so browsers save files
//! - Strip headers that belong to the upstream connection
//!
//! # Design Decisions
//! - Content type dispatch is an explicit enum keyed on the media type essence
//! - Rewriting runs on raw bytes; the page's charset is left alone
//! - Only HTML is buffered; other bodies stream through

use std::borrow::Cow;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use regex::bytes::{NoExpand, Regex};

use crate::config::RewriteConfig;
use crate::proxy::link::COMPONENT;

/// Name used when the target URL has no usable last path segment.
pub const FALLBACK_FILE_NAME: &str = "download";

/// Redirect statuses handed back to the caller when the fetch layer does not follow them.
pub const FORWARDED_REDIRECTS: [StatusCode; 5] = [
    StatusCode::MOVED_PERMANENTLY,
    StatusCode::FOUND,
    StatusCode::SEE_OTHER,
    StatusCode::TEMPORARY_REDIRECT,
    StatusCode::PERMANENT_REDIRECT,
];

pub fn is_forwarded_redirect(status: StatusCode) -> bool {
    FORWARDED_REDIRECTS.contains(&status)
}

/// How a response body is treated, by declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `text/html`, with or without parameters.
    Html,
    /// Anything else, including a missing content type.
    Other,
}

impl ContentKind {
    pub fn of(headers: &HeaderMap) -> Self {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(Self::Other, Self::from_content_type)
    }

    pub fn from_content_type(value: &str) -> Self {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("text/html") {
            Self::Html
        } else {
            Self::Other
        }
    }
}

/// Rewrites the upstream's public origin inside HTML bodies.
#[derive(Debug, Clone)]
pub struct HtmlRewriter {
    pattern: Regex,
    scheme: String,
    public_host: Option<String>,
}

impl HtmlRewriter {
    /// Build a rewriter, or `None` when rewriting is disabled.
    pub fn from_config(config: &RewriteConfig) -> Result<Option<Self>, regex::Error> {
        if !config.enabled {
            return Ok(None);
        }

        Ok(Some(Self {
            pattern: Regex::new(&config.pattern)?,
            scheme: config.public_scheme.clone(),
            public_host: config.public_host.clone(),
        }))
    }

    /// The origin links are rewritten to. The configured public host wins
    /// over the host the request arrived on.
    pub fn origin(&self, request_host: Option<&str>) -> Option<String> {
        self.public_host
            .as_deref()
            .or(request_host)
            .map(|host| format!("{}://{}", self.scheme, host))
    }

    /// Replace every match of the upstream pattern with `origin`.
    pub fn rewrite<'a>(&self, body: &'a [u8], origin: &str) -> Cow<'a, [u8]> {
        self.pattern.replace_all(body, NoExpand(origin.as_bytes()))
    }
}

/// Last path segment of a URL, without query or fragment, percent-decoded.
pub fn file_name_from_url(url: &str) -> String {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_owned(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_owned()
        }
    };

    let decoded = percent_decode_str(&segment).decode_utf8_lossy();
    sanitize_file_name(&decoded).unwrap_or_else(|| FALLBACK_FILE_NAME.to_owned())
}

/// Reduce a suggested name to a bare file name: no directories, no control
/// characters, never `.` or `..`.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let name: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    match name.trim() {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

/// `attachment; filename="<name>"`, with an RFC 5987 `filename*` parameter
/// added when the name is not plain ASCII.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let quoted = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    let mut value = format!("attachment; filename=\"{quoted}\"");

    if !file_name.is_ascii() {
        value.push_str("; filename*=UTF-8''");
        value.push_str(&utf8_percent_encode(file_name, COMPONENT).to_string());
    }

    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Drop headers describing the upstream connection's framing.
pub fn strip_connection_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONNECTION);
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove("keep-alive");
}

/// Drop headers that no longer describe a rewritten body.
pub fn strip_body_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONTENT_ENCODING);
}
