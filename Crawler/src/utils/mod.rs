// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Turn a scraped `href`/`src` value into an absolute URL.
///
/// Protocol-relative values (`//host/x`) are upgraded to `https:`; path values
/// are resolved against `base_url`. Empty input stays empty.
pub fn absolutize(base_url: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.starts_with("//") {
        return format!("https:{raw}");
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    match Url::parse(base_url) {
        Ok(base) => resolve_url(&base, raw),
        Err(_) if raw.starts_with('/') => format!("{}{}", base_url.trim_end_matches('/'), raw),
        Err(_) => format!("{}/{}", base_url.trim_end_matches('/'), raw),
    }
}

/// Extract the host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
