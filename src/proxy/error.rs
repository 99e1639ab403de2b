//! Per-request error type.

use std::error::Error as StdError;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::proxy::target::TargetError;

/// Errors that end a proxied request early.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The path did not name an acceptable target. No network call was made.
    #[error(transparent)]
    InvalidTarget(#[from] TargetError),

    /// DNS, TLS, connection or body transfer failure talking to the upstream.
    #[error("request failed: {}", error_chain(.0))]
    Upstream(#[source] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
            self.to_string(),
        )
            .into_response()
    }
}

/// `reqwest` hides the interesting part (DNS, refused, TLS) in the source chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_response() {
        let err = ProxyError::from(TargetError::Scheme);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "invalid download link: must start with http:// or https://"
        );

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=UTF-8"
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_message() {
        // Builder errors surface from `send` without touching the network.
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();
        let err = ProxyError::Upstream(err);

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("request failed: "));
    }
}
