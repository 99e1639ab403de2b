//! User-Agent presets and resolution.

/// Browser User-Agent strings offered by the landing page and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Chrome,
    Safari,
    Firefox,
    Edge,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Preset; 4] = [Preset::Chrome, Preset::Safari, Preset::Firefox, Preset::Edge];

    /// Short lowercase name, as accepted by [`Preset::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Preset::Chrome => "chrome",
            Preset::Safari => "safari",
            Preset::Firefox => "firefox",
            Preset::Edge => "edge",
        }
    }

    /// The full User-Agent string.
    pub fn user_agent(self) -> &'static str {
        match self {
            Preset::Chrome => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36",
            Preset::Safari => "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.3.1 Safari/605.1.15",
            Preset::Firefox => "Mozilla/5.0 (Windows NT 6.2; rv:139.541.193) Gecko/20100101 Firefox/139.541.193",
            Preset::Edge => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36 Edg/139.0.3405.125",
        }
    }

    /// Look up a preset by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

/// Expand a preset name to its User-Agent string; anything else is used verbatim.
pub fn expand(value: &str) -> &str {
    Preset::from_name(value).map_or(value, |preset| preset.user_agent())
}

/// Pick the User-Agent to send upstream: the request's own choice, else the default.
pub fn resolve<'a>(requested: Option<&'a str>, default: &'a str) -> &'a str {
    requested.filter(|ua| !ua.trim().is_empty()).unwrap_or(default)
}
