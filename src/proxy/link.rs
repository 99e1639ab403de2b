//! Building proxy links for a target URL.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::proxy::target::UA_PARAM;

/// All ASCII characters in the [component percent-encode
/// set](https://url.spec.whatwg.org/#component-percent-encode-set).
///
/// Using this with [`utf8_percent_encode`] gives identical results to JavaScript's
/// [`encodeURIComponent`](https://developer.mozilla.org/docs/Web/JavaScript/Reference/Global_Objects/encodeURIComponent),
/// which is what the landing page uses to build links.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a string as a single URI component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Build `<base>/<encoded target>[?ua=<encoded user agent>]`.
pub fn proxy_link(base: &str, target: &str, user_agent: Option<&str>) -> String {
    let mut link = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        encode_component(target)
    );

    if let Some(ua) = user_agent {
        link.push('?');
        link.push_str(UA_PARAM);
        link.push('=');
        link.push_str(&encode_component(ua));
    }

    link
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_encode_uri_component() {
        assert_eq!(
            encode_component("https://example.com/a b.zip?x=1"),
            "https%3A%2F%2Fexample.com%2Fa%20b.zip%3Fx%3D1"
        );
        assert_eq!(encode_component("it's-(ok)_~*!."), "it's-(ok)_~*!.");
        assert_eq!(encode_component("é+&"), "%C3%A9%2B%26");
    }

    #[test]
    fn test_proxy_link() {
        assert_eq!(
            proxy_link("https://proxy.example/", "https://host/f.zip", None),
            "https://proxy.example/https%3A%2F%2Fhost%2Ff.zip"
        );
        assert_eq!(
            proxy_link("https://proxy.example", "https://host/f.zip", Some("Mozilla/5.0 (X11)")),
            "https://proxy.example/https%3A%2F%2Fhost%2Ff.zip?ua=Mozilla%2F5.0%20(X11)"
        );
    }
}
