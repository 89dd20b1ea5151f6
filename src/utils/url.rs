// src/utils/url.rs

//! URL manipulation and link tidiness checks.

use url::Url;

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use insight_hub::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.com/path/", "page.html").as_deref(),
///     Some("https://example.com/path/page.html")
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(String::from)
}

/// Whether a link is structurally acceptable as an index line.
///
/// The link must be an absolute http(s) URL with a host, carry no
/// whitespace, control characters, fragment or credentials, and already be in
/// the canonical serialization the `url` crate produces.
pub fn is_well_formed(link: &str) -> bool {
    if link.is_empty() || link.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Ok(parsed) = Url::parse(link) else {
        return false;
    };
    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some()
        && parsed.fragment().is_none()
        && parsed.username().is_empty()
        && parsed.password().is_none()
        && parsed.as_str() == link
}

/// Whether a link may be stored for the source whose home page is `home_page`.
///
/// On top of [`is_well_formed`], the scheme, host and port must match the home
/// page's.
pub fn is_tidy(link: &str, home_page: &str) -> bool {
    if !is_well_formed(link) {
        return false;
    }
    let (Ok(link), Ok(home)) = (Url::parse(link), Url::parse(home_page)) else {
        return false;
    };
    link.scheme() == home.scheme()
        && link.host_str() == home.host_str()
        && link.port_or_known_default() == home.port_or_known_default()
}
