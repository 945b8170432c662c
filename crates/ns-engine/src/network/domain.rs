use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ns_core::{Request, StorageIndex};
use ns_rules::domain::is_wildcard_or_regex;
use ns_rules::options::split_unescaped;
use ns_rules::NetworkRule;

use super::{LookupTable, TableContext};
use crate::storage::ScannedRule;
use crate::tokenizer::RuleParts;

/// Rules with `$domain=`, keyed by the hash of each permitted domain.
#[derive(Debug, Default)]
pub struct DomainLookupTable {
    buckets: HashMap<u32, Vec<StorageIndex>>,
    /// Indices already pruned from some bucket
    pruned: HashSet<StorageIndex>,
    count: usize,
}

impl DomainLookupTable {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Plain, non-negated entries of a `$domain=` value.
pub(crate) fn permitted_plain_domains(value: &str, separator: char) -> Vec<String> {
    split_unescaped(value, separator)
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.starts_with('~') && !is_wildcard_or_regex(d))
        .map(str::to_ascii_lowercase)
        .collect()
}

impl LookupTable for DomainLookupTable {
    fn name(&self) -> &'static str {
        "domain"
    }

    fn add(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        let parts = match rule.parts() {
            RuleParts::Network(parts) => parts,
            _ => return false,
        };
        let domains = match parts.domains {
            Some(span) => permitted_plain_domains(span.of(rule.line()), '|'),
            None => return false,
        };
        if domains.is_empty() {
            return false;
        }

        for domain in &domains {
            let hash = ctx.hashes.hash(domain);
            self.buckets.entry(hash).or_default().push(rule.index);
        }
        self.count += 1;
        true
    }

    fn match_all(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>> {
        let mut hostnames: Vec<&String> = request.subdomains.iter().collect();
        if request.source_hostname.as_deref().is_some_and(|s| s != request.hostname) {
            hostnames.extend(request.source_subdomains.iter());
        }

        let mut hashes = Vec::with_capacity(hostnames.len());
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for hostname in hostnames {
            let hash = ctx.hashes.hash(hostname);
            if let Some(bucket) = self.buckets.get(&hash) {
                hashes.push(hash);
                // A rule listing several domains sits in several buckets
                candidates.extend(bucket.iter().copied().filter(|index| seen.insert(*index)));
            }
        }

        let mut matched = Vec::new();
        let mut stale = HashSet::new();
        for index in candidates {
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
            for hash in hashes {
                if let Some(bucket) = self.buckets.get_mut(&hash) {
                    bucket.retain(|index| !stale.contains(index));
                }
            }
            for index in stale {
                if self.pruned.insert(index) {
                    self.count -= 1;
                }
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
    fn test_permitted_plain_domains() {
        assert_eq!(
            permitted_plain_domains("A.com|~b.com|c.*|/d/|e.org", '|'),
            vec!["a.com", "e.org"]
        );
        assert!(permitted_plain_domains("~a.com|b.*", '|').is_empty());
    }
}
