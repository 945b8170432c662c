//! Public Suffix List (PSL) utilities for eTLD+1 extraction
//!
//! [`PublicSuffixes`] decomposes a hostname into its public suffix,
//! registrable domain and subdomain chain. A full list can be loaded from
//! PSL text; without one, a small two-part-TLD heuristic is used.
//!
//! # Examples
//!
//! ```
//! use ns_core::psl::PublicSuffixes;
//!
//! let psl = PublicSuffixes::default();
//! assert_eq!(psl.registrable_domain("sub.example.com"), "example.com");
//! assert_eq!(psl.registrable_domain("sub.example.co.uk"), "example.co.uk");
//! ```

use std::net::IpAddr;

use publicsuffix::{List, Psl};

/// Error type for PSL loading.
#[derive(Debug, thiserror::Error)]
pub enum PslError {
    #[error("Invalid public suffix list: {0}")]
    InvalidList(String),
}

/// Common two-part TLDs for fallback.
const COMMON_TWO_PART_TLDS: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// Hostname decomposition backed by an optional public suffix list.
#[derive(Default)]
pub struct PublicSuffixes {
    list: Option<List>,
}

impl PublicSuffixes {
    /// Decomposition using only the built-in heuristic.
    pub fn heuristic() -> Self {
        Self::default()
    }

    /// Parse a `public_suffix_list.dat` document.
    pub fn from_list(text: &str) -> Result<Self, PslError> {
        let list: List = text
            .parse()
            .map_err(|e| PslError::InvalidList(format!("{e}")))?;
        Ok(Self { list: Some(list) })
    }

    /// Whether a full list is loaded.
    pub fn has_list(&self) -> bool {
        self.list.is_some()
    }

    /// Public suffix of `host` (e.g. `co.uk` for `www.example.co.uk`).
    /// `host` is expected to be lowercase.
    pub fn public_suffix<'a>(&self, host: &'a str) -> &'a str {
        let host = host.trim_end_matches('.');
        if host.is_empty() || is_ip_literal(host) {
            return host;
        }

        if let Some(list) = &self.list {
            if let Some(suffix) = list.suffix(host.as_bytes()) {
                let len = suffix.as_bytes().len();
                if len <= host.len() {
                    return &host[host.len() - len..];
                }
            }
        }

        fallback_suffix(host)
    }

    /// Registrable domain (eTLD+1) of `host`. Returns `host` itself for IP
    /// literals, single-label hosts and bare public suffixes.
    pub fn registrable_domain<'a>(&self, host: &'a str) -> &'a str {
        let host = host.trim_end_matches('.');
        if is_ip_literal(host) {
            return host;
        }

        let suffix = self.public_suffix(host);
        if suffix.len() >= host.len() {
            return host;
        }

        // One label above the suffix
        let prefix = &host[..host.len() - suffix.len() - 1];
        let start = prefix.rfind('.').map_or(0, |idx| idx + 1);
        &host[start..]
    }

    /// Walk from `host` down to its public suffix, most specific first.
    ///
    /// `a.b.example.co.uk` yields `a.b.example.co.uk`, `b.example.co.uk`,
    /// `example.co.uk`, `co.uk`.
    pub fn subdomains(&self, host: &str) -> Vec<String> {
        let host = host.trim_end_matches('.');
        if host.is_empty() {
            return Vec::new();
        }
        if is_ip_literal(host) {
            return vec![host.to_string()];
        }

        let suffix_len = self.public_suffix(host).len();
        let mut chain = Vec::new();
        let mut current = host;
        loop {
            chain.push(current.to_string());
            if current.len() <= suffix_len {
                break;
            }
            match get_parent_domain(current) {
                Some(parent) if parent.len() >= suffix_len => current = parent,
                _ => break,
            }
        }
        chain
    }

    /// Check if two hosts share the same eTLD+1.
    pub fn is_same_site(&self, host1: &str, host2: &str) -> bool {
        self.registrable_domain(host1) == self.registrable_domain(host2)
    }
}

/// Fallback public suffix heuristic.
fn fallback_suffix(host: &str) -> &str {
    let mut dots = host.rmatch_indices('.').map(|(idx, _)| idx);
    let last = match dots.next() {
        Some(idx) => idx,
        None => return host,
    };

    if let Some(second) = dots.next() {
        let last_two = &host[second + 1..];
        if COMMON_TWO_PART_TLDS.contains(&last_two) {
            return last_two;
        }
    } else if COMMON_TWO_PART_TLDS.contains(&host) {
        return host;
    }

    &host[last + 1..]
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Whether `host` is an IPv4 or (optionally bracketed) IPv6 literal.
pub fn is_ip_literal(host: &str) -> bool {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_LIST: &str = "// ===BEGIN ICANN DOMAINS===\ncom\nuk\nco.uk\norg\n*.ck\n!www.ck\n// ===END ICANN DOMAINS===\n";

    #[test]
    fn test_fallback_suffix() {
        assert_eq!(fallback_suffix("example.com"), "com");
        assert_eq!(fallback_suffix("sub.example.co.uk"), "co.uk");
        assert_eq!(fallback_suffix("localhost"), "localhost");
    }

    #[test]
    fn test_registrable_domain_heuristic() {
        let psl = PublicSuffixes::heuristic();
        assert_eq!(psl.registrable_domain("example.com"), "example.com");
        assert_eq!(psl.registrable_domain("a.b.example.com"), "example.com");
        assert_eq!(psl.registrable_domain("example.co.uk"), "example.co.uk");
        assert_eq!(psl.registrable_domain("com"), "com");
        assert_eq!(psl.registrable_domain("192.168.0.1"), "192.168.0.1");
    }

    #[test]
    fn test_subdomains() {
        let psl = PublicSuffixes::heuristic();
        assert_eq!(
            psl.subdomains("a.b.example.co.uk"),
            vec!["a.b.example.co.uk", "b.example.co.uk", "example.co.uk", "co.uk"]
        );
        assert_eq!(psl.subdomains("example.org"), vec!["example.org", "org"]);
        assert_eq!(psl.subdomains("localhost"), vec!["localhost"]);
        assert_eq!(psl.subdomains("10.0.0.1"), vec!["10.0.0.1"]);
        assert!(psl.subdomains("").is_empty());
    }

    #[test]
    fn test_loaded_list() {
        let psl = PublicSuffixes::from_list(SMALL_LIST).expect("list should parse");
        assert!(psl.has_list());
        assert_eq!(psl.registrable_domain("www.example.co.uk"), "example.co.uk");
        assert_eq!(psl.public_suffix("www.example.co.uk"), "co.uk");
        assert!(psl.is_same_site("a.example.com", "b.example.com"));
        assert!(!psl.is_same_site("example.com", "example.org"));
    }

    #[test]
    fn test_get_parent_domain() {
        assert_eq!(get_parent_domain("sub.example.com"), Some("example.com"));
        assert_eq!(get_parent_domain("example.com"), Some("com"));
        assert_eq!(get_parent_domain("com"), None);
        assert_eq!(get_parent_domain(""), None);
    }

    #[test]
    fn test_is_ip_literal() {
        assert!(is_ip_literal("127.0.0.1"));
        assert!(is_ip_literal("::1"));
        assert!(is_ip_literal("[::1]"));
        assert!(!is_ip_literal("example.com"));
    }
}
