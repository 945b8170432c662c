use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ns_core::{Request, StorageIndex};
use ns_rules::NetworkRule;

use super::{LookupTable, TableContext};
use crate::storage::ScannedRule;
use crate::tokenizer::RuleParts;

/// Rules of the form `||host^` or `||host/path`, keyed by host hash.
#[derive(Debug, Default)]
pub struct HostnameLookupTable {
    buckets: HashMap<u32, Vec<StorageIndex>>,
    count: usize,
}

impl HostnameLookupTable {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Host of an indexable `||host^` / `||host/path` pattern.
pub(crate) fn indexable_hostname(pattern: &str) -> Option<&str> {
    let rest = pattern.strip_prefix("||")?;
    let host = match rest.find(['^', '/']) {
        Some(idx) if rest.as_bytes()[idx] == b'^' && idx + 1 == rest.len() => &rest[..idx],
        Some(idx) if rest.as_bytes()[idx] == b'/' => &rest[..idx],
        _ => return None,
    };

    let valid = !host.is_empty()
        && host.contains('.')
        && !host.ends_with('.')
        && !host.starts_with('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
    valid.then_some(host)
}

impl LookupTable for HostnameLookupTable {
    fn name(&self) -> &'static str {
        "hostname"
    }

    fn add(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        let parts = match rule.parts() {
            RuleParts::Network(parts) => parts,
            _ => return false,
        };
        let host = match indexable_hostname(parts.pattern.of(rule.line())) {
            Some(host) => host,
            None => return false,
        };

        let hash = ctx.hashes.hash(host);
        self.buckets.entry(hash).or_default().push(rule.index);
        self.count += 1;
        true
    }

    fn match_all(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>> {
        let mut matched = Vec::new();

        for subdomain in &request.subdomains {
            let hash = ctx.hashes.hash(subdomain);
            let bucket = match self.buckets.get_mut(&hash) {
                Some(bucket) => bucket,
                None => continue,
            };

            let mut stale = HashSet::new();
            for &index in bucket.iter() {
                match ctx.storage.retrieve_network_rule(index) {
                    Some(rule) => {
                        if rule.matches(request) {
                            matched.push(rule);
                        }
                    }
                    None => {
                        stale.insert(index);
                    }
                }
            }

            if !stale.is_empty() {
                let before = bucket.len();
                bucket.retain(|index| !stale.contains(index));
                self.count -= before - bucket.len();
            }
        }

        matched
    }

    fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexable_hostname() {
        assert_eq!(indexable_hostname("||example.org^"), Some("example.org"));
        assert_eq!(indexable_hostname("||ads.example.org/banner"), Some("ads.example.org"));
        assert_eq!(indexable_hostname("||localhost^"), None);
        assert_eq!(indexable_hostname("||ads.*.org^"), None);
        assert_eq!(indexable_hostname("||example.org.^"), None);
        assert_eq!(indexable_hostname("||example.org"), None);
        assert_eq!(indexable_hostname("||example.org^*"), None);
        assert_eq!(indexable_hostname("example.org^"), None);
    }
}
