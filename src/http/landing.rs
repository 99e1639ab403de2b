//! The landing page served at `/`.
//!
//! # Design Decisions
//! - The markup is embedded at compile time; per-deployment settings (title,
//!   allow-list, appended query, User-Agent presets) are injected as one JSON
//!   object when a runtime is built
//! - The page's checks mirror `Policy::check` but are UX only; the server
//!   validates every request regardless

use std::collections::BTreeMap;

use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::config::LandingConfig;
use crate::proxy::user_agent::Preset;
use crate::proxy::Policy;

/// The landing page markup, embedded at compile time.
const TEMPLATE: &str = include_str!("../../assets/index.html");

/// Placeholder in the template replaced by the settings object.
const SETTINGS_SLOT: &str = "__LANDING_SETTINGS__";

/// Content type of the landing page.
pub const LANDING_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageSettings<'a> {
    title: &'a str,
    allowed_hosts: &'a [String],
    append_query: Option<&'a str>,
    user_agents: BTreeMap<&'static str, &'static str>,
}

/// Render the landing page for one policy.
pub fn render(policy: &Policy, config: &LandingConfig) -> Result<String, serde_json::Error> {
    let settings = PageSettings {
        title: &config.title,
        allowed_hosts: policy.allowed_hosts(),
        append_query: config.append_query.as_deref(),
        user_agents: Preset::ALL
            .into_iter()
            .map(|preset| (preset.name(), preset.user_agent()))
            .collect(),
    };

    // `</` would let a configured string close the script element.
    let json = serde_json::to_string(&settings)?.replace("</", "<\\/");
    Ok(TEMPLATE.replace(SETTINGS_SLOT, &json))
}

/// Serve a rendered landing page.
pub fn landing_page(page: &str) -> Response {
    (
        [(header::CONTENT_TYPE, LANDING_CONTENT_TYPE)],
        Html(page.to_owned()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PolicyConfig, Variant};

    fn policy(hosts: &[&str]) -> Policy {
        Policy::from_config(&PolicyConfig {
            variant: Variant::Strict,
            allowed_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..PolicyConfig::default()
        })
    }

    #[test]
    fn test_allow_list_reaches_the_page() {
        let page = render(
            &policy(&["dl.sourceforge.net"]),
            &LandingConfig {
                title: "SourceForge Download Proxy".into(),
                append_query: Some("viasf=1".into()),
            },
        )
        .unwrap();

        assert!(!page.contains(SETTINGS_SLOT));
        assert!(page.contains(r#""allowedHosts":["dl.sourceforge.net"]"#));
        assert!(page.contains(r#""appendQuery":"viasf=1""#));
        assert!(page.contains(r#""title":"SourceForge Download Proxy""#));
        assert!(page.contains("allowedHosts.some"));
    }

    #[test]
    fn test_open_policy_page() {
        let page = render(&policy(&[]), &LandingConfig::default()).unwrap();
        assert!(page.contains(r#""allowedHosts":[]"#));
        assert!(page.contains(r#""appendQuery":null"#));
        assert!(page.contains(Preset::Firefox.user_agent()));
    }

    #[test]
    fn test_configured_strings_cannot_close_the_script() {
        let page = render(
            &policy(&["</script><script>alert(1)</script>"]),
            &LandingConfig::default(),
        )
        .unwrap();
        assert!(!page.contains("</script><script>alert(1)"));
        assert!(page.contains(r#"<\/script><script>alert(1)<\/script>"#));
    }

    #[test]
    fn test_landing_page_headers() {
        let response = landing_page("<p>hi</p>");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            LANDING_CONTENT_TYPE
        );
    }
}
