//! Normalized request passed to every matcher.

use crate::psl::PublicSuffixes;
use crate::types::{MethodMask, RequestType};
use crate::url::{extract_host, extract_relative_path, truncate_to_boundary};

/// URLs longer than this are truncated before pattern matching.
pub const MAX_URL_MATCH_LENGTH: usize = 4096;

/// Context for a request being matched.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request URL, truncated to [`MAX_URL_MATCH_LENGTH`]
    pub url: String,
    /// Lowercased `url`
    pub url_lowercase: String,
    /// Request hostname (lowercase, no port)
    pub hostname: String,
    /// Request eTLD+1
    pub domain: String,
    /// Hostname down to its public suffix, most specific first
    pub subdomains: Vec<String>,
    /// Path and query of the URL
    pub path: String,
    /// Context/initiator URL
    pub source_url: Option<String>,
    /// Context/initiator hostname
    pub source_hostname: Option<String>,
    /// Context/initiator eTLD+1
    pub source_domain: Option<String>,
    pub source_subdomains: Vec<String>,
    pub request_type: RequestType,
    pub method: Option<MethodMask>,
    /// `None` when there is no source to compare against
    pub third_party: Option<bool>,
    /// Set for DNS-level queries where only the hostname is known
    pub is_hostname_request: bool,
}

impl Request {
    pub fn new(
        url: &str,
        source_url: Option<&str>,
        request_type: RequestType,
        psl: &PublicSuffixes,
    ) -> Self {
        let url = truncate_to_boundary(url, MAX_URL_MATCH_LENGTH).to_string();
        let url_lowercase = url.to_ascii_lowercase();
        let hostname = extract_host(&url_lowercase).unwrap_or_default().to_string();
        let domain = psl.registrable_domain(&hostname).to_string();
        let subdomains = psl.subdomains(&hostname);
        let path = extract_relative_path(&url).to_string();

        let source_url = source_url.filter(|s| !s.is_empty()).map(str::to_string);
        let source_hostname = source_url
            .as_deref()
            .and_then(extract_host)
            .map(str::to_ascii_lowercase);
        let source_domain = source_hostname
            .as_deref()
            .map(|h| psl.registrable_domain(h).to_string());
        let source_subdomains = source_hostname
            .as_deref()
            .map(|h| psl.subdomains(h))
            .unwrap_or_default();

        let third_party = source_hostname
            .as_deref()
            .map(|source| !psl.is_same_site(source, &hostname));

        Self {
            url,
            url_lowercase,
            hostname,
            domain,
            subdomains,
            path,
            source_url,
            source_hostname,
            source_domain,
            source_subdomains,
            request_type,
            method: None,
            third_party,
            is_hostname_request: false,
        }
    }

    /// A DNS-style query for `hostname` with no URL path or source.
    pub fn hostname_only(hostname: &str, psl: &PublicSuffixes) -> Self {
        let hostname = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
        let mut request = Self::new(
            &format!("http://{hostname}/"),
            None,
            RequestType::DOCUMENT,
            psl,
        );
        request.is_hostname_request = true;
        request
    }

    pub fn with_method(mut self, method: MethodMask) -> Self {
        self.method = Some(method);
        self
    }

    /// Hostname used for `$domain` checks: the source when present.
    pub fn context_hostname(&self) -> &str {
        self.source_hostname.as_deref().unwrap_or(&self.hostname)
    }
}
