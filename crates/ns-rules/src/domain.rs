//! `$domain=` / cosmetic domain lists.

use regex::Regex;

use crate::error::RuleError;
use crate::options::split_unescaped;
use crate::pattern::{hostname_matches, is_regex_literal};

/// One domain in a modifier list.
#[derive(Debug, Clone)]
pub enum DomainEntry {
    /// `example.org`, also matches its subdomains
    Plain(String),
    /// `example.*`, stored without the `.*`
    Wildcard(String),
    /// `/regex/`; `None` if the regex failed to compile
    Regex(String, Option<Regex>),
}

impl DomainEntry {
    fn parse(text: &str) -> Self {
        if is_regex_literal(text) {
            let source = &text[1..text.len() - 1];
            let compiled = match Regex::new(source) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::debug!("Invalid domain regex {text:?}: {e}");
                    None
                }
            };
            return DomainEntry::Regex(text.to_string(), compiled);
        }

        let lower = text.to_ascii_lowercase();
        match lower.strip_suffix(".*") {
            Some(base) => DomainEntry::Wildcard(base.to_string()),
            None => DomainEntry::Plain(lower),
        }
    }

    pub fn matches(&self, hostname: &str) -> bool {
        match self {
            DomainEntry::Plain(domain) => hostname_matches(hostname, domain),
            DomainEntry::Wildcard(base) => wildcard_matches(hostname, base),
            DomainEntry::Regex(_, Some(re)) => re.is_match(hostname),
            DomainEntry::Regex(_, None) => false,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, DomainEntry::Plain(_))
    }
}

/// `base.*` matches any hostname with a `base.<tld>` label sequence.
fn wildcard_matches(hostname: &str, base: &str) -> bool {
    let mut start = 0;
    loop {
        let rest = &hostname[start..];
        if rest.len() > base.len() && rest.starts_with(base) && rest.as_bytes()[base.len()] == b'.' {
            return true;
        }
        match rest.find('.') {
            Some(idx) => start += idx + 1,
            None => return false,
        }
    }
}

/// Whether a raw domain-list entry is a wildcard or regex domain.
pub fn is_wildcard_or_regex(entry: &str) -> bool {
    let entry = entry.trim().trim_start_matches('~');
    entry.ends_with(".*") || is_regex_literal(entry)
}

/// Permitted and restricted (`~`) domains of a rule.
#[derive(Debug, Clone, Default)]
pub struct DomainModifier {
    permitted: Vec<DomainEntry>,
    restricted: Vec<DomainEntry>,
}

impl DomainModifier {
    /// Parse a `separator`-delimited domain list (`|` for `$domain=`, `,`
    /// for cosmetic rules).
    pub fn parse(value: &str, separator: char) -> Result<Self, RuleError> {
        let mut modifier = Self::default();

        for raw in split_unescaped(value, separator) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (negated, domain) = match raw.strip_prefix('~') {
                Some(rest) => (true, rest.trim()),
                None => (false, raw),
            };
            if domain.is_empty() {
                return Err(RuleError::InvalidModifierValue {
                    name: "domain".to_string(),
                    value: value.to_string(),
                });
            }

            let entry = DomainEntry::parse(domain);
            if negated {
                modifier.restricted.push(entry);
            } else {
                modifier.permitted.push(entry);
            }
        }

        if modifier.permitted.is_empty() && modifier.restricted.is_empty() {
            return Err(RuleError::InvalidModifierValue {
                name: "domain".to_string(),
                value: value.to_string(),
            });
        }
        Ok(modifier)
    }

    /// Whether a rule with this modifier applies on `hostname`.
    pub fn matches_domain(&self, hostname: &str) -> bool {
        if self.restricted.iter().any(|e| e.matches(hostname)) {
            return false;
        }
        self.permitted.is_empty() || self.permitted.iter().any(|e| e.matches(hostname))
    }

    pub fn permitted(&self) -> &[DomainEntry] {
        &self.permitted
    }

    pub fn restricted(&self) -> &[DomainEntry] {
        &self.restricted
    }

    /// Plain permitted domains, in list order.
    pub fn permitted_domains(&self) -> impl Iterator<Item = &str> {
        self.permitted.iter().filter_map(|entry| match entry {
            DomainEntry::Plain(domain) => Some(domain.as_str()),
            _ => None,
        })
    }

    pub fn has_permitted(&self) -> bool {
        !self.permitted.is_empty()
    }

    pub fn has_wildcard_or_regex(&self) -> bool {
        self.permitted
            .iter()
            .chain(&self.restricted)
            .any(|entry| !entry.is_plain())
    }
}
