//! Address normalization for URL button replies
//!
//! An address is accepted only with an `http://` or `https://` scheme, a
//! dotted host, and no commas, whitespace, or second domain glued on. A
//! bare host (`google.com`, `www.amazon.in`) is corrected by prefixing
//! `https://`. Anything else is rejected with a fixed prompt and must never
//! reach a template.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Fixed reply sent when an address cannot be used
pub const INVALID_URL_PROMPT: &str = "Please type a valid URL (e.g. https://www.google.com)";

static HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i)[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*\.[a-z]{2,63}(?::\d{1,5})?$",
    )
    .expect("host pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("address contains separators: {0:?}")]
    Separators(String),
    #[error("address has no usable host: {0:?}")]
    BadHost(String),
    #[error("address repeats its scheme: {0:?}")]
    RepeatedScheme(String),
    #[error("address uses a scheme other than http or https: {0:?}")]
    UnsupportedScheme(String),
}

impl UrlError {
    /// What the user sees
    pub fn prompt(&self) -> &'static str {
        INVALID_URL_PROMPT
    }
}

/// An accepted address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: String,
    /// True when `https://` was added
    pub corrected: bool,
}

pub fn normalize_url(input: &str) -> Result<NormalizedUrl, UrlError> {
    let input = input.trim();

    if input.is_empty() || input.contains(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        return Err(UrlError::Separators(input.to_string()));
    }

    let lower = input.to_ascii_lowercase();
    let (url, rest, corrected) = if let Some(rest) = strip_scheme(input, &lower) {
        (input.to_string(), rest, false)
    } else {
        (format!("https://{input}"), input, true)
    };

    if corrected && has_foreign_scheme(input) {
        return Err(UrlError::UnsupportedScheme(input.to_string()));
    }

    let rest_lower = rest.to_ascii_lowercase();
    if rest_lower.contains("http://") || rest_lower.contains("https://") || rest.contains("://") {
        return Err(UrlError::RepeatedScheme(input.to_string()));
    }

    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if !HOST.is_match(host) {
        return Err(UrlError::BadHost(input.to_string()));
    }

    Ok(NormalizedUrl { url, corrected })
}

/// `ftp://host` and the like. A leading token glued onto `http(s)://`
/// (`mystorehttps://`) is a repeated scheme instead.
fn has_foreign_scheme(input: &str) -> bool {
    input.split_once("://").is_some_and(|(scheme, _)| {
        let scheme = scheme.to_ascii_lowercase();
        !scheme.is_empty()
            && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
            && !scheme.ends_with("http")
            && !scheme.ends_with("https")
    })
}

fn strip_scheme<'a>(input: &'a str, lower: &str) -> Option<&'a str> {
    ["https://", "http://"]
        .iter()
        .find(|scheme| lower.starts_with(*scheme))
        .and_then(|scheme| input.get(scheme.len()..))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls_pass_through() {
        for url in [
            "https://www.google.com",
            "http://shop.example.in/sale?id=3",
            "https://example.com:8443/path",
            "HTTPS://Example.COM",
        ] {
            let normalized = normalize_url(url).unwrap();
            assert_eq!(normalized.url, url);
            assert!(!normalized.corrected);
        }
    }

    #[test]
    fn test_missing_scheme_is_corrected() {
        let normalized = normalize_url("www.amazon.in").unwrap();
        assert_eq!(normalized.url, "https://www.amazon.in");
        assert!(normalized.corrected);
        assert_eq!(normalize_url(" google.com ").unwrap().url, "https://google.com");
    }

    #[test]
    fn test_joined_domains_rejected() {
        let err = normalize_url("www.google.in,aaas.in,aaaaa").unwrap_err();
        assert_eq!(err, UrlError::Separators("www.google.in,aaas.in,aaaaa".to_string()));
        assert_eq!(err.prompt(), INVALID_URL_PROMPT);
    }

    #[test]
    fn test_other_malformed_rejected() {
        assert!(matches!(normalize_url("aaaaa"), Err(UrlError::BadHost(_))));
        assert!(matches!(normalize_url("https://localhost"), Err(UrlError::BadHost(_))));
        assert!(matches!(normalize_url("my site.com"), Err(UrlError::Separators(_))));
        assert!(matches!(
            normalize_url("https://a.comhttps://b.com"),
            Err(UrlError::RepeatedScheme(_))
        ));
        assert!(matches!(normalize_url("example..com"), Err(UrlError::BadHost(_))));
        assert!(matches!(normalize_url(""), Err(UrlError::Separators(_))));
    }

    #[test]
    fn test_unsupported_scheme_named() {
        for input in ["ftp://files.example.com", "mailto://sales@example.com", "FTP://a.com"] {
            let err = normalize_url(input).unwrap_err();
            assert_eq!(err, UrlError::UnsupportedScheme(input.to_string()));
            assert_eq!(err.prompt(), INVALID_URL_PROMPT);
        }
        // glued onto a real scheme: still a repeat
        assert!(matches!(
            normalize_url("mystorehttps://b.com"),
            Err(UrlError::RepeatedScheme(_))
        ));
        assert!(matches!(
            normalize_url("a.comhttps://b.com"),
            Err(UrlError::RepeatedScheme(_))
        ));
    }
}
