//! Utility functions and helpers.

pub mod http;

use sha2::{Digest, Sha256};
use url::Url;

/// SHA-256 hex digest of a canonical link.
///
/// Used both as the ledger slug and as the archive file stem.
pub fn content_address(link: &str) -> String {
    hex::encode(Sha256::digest(link.as_bytes()))
}

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Parse user input as a URL, assuming `https` when no scheme is given.
pub fn parse_source_url(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    Url::parse(trimmed)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{trimmed}")).ok())
}

/// Host of a URL with any leading `www.` removed, lowercased.
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
