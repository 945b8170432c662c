//! Hostname-only matching for DNS-level blocking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ns_core::{HashCache, PublicSuffixes, Request, StorageIndex};
use ns_rules::{HostRule, NetworkRule};

use crate::config::EngineOptions;
use crate::matching_result::MatchingResult;
use crate::network::{NetworkEngine, TableContext};
use crate::rule_list::ScanMode;
use crate::storage::{RuleStorage, ScannedRule};
use crate::tokenizer::RuleParts;

/// Outcome of a DNS lookup.
#[derive(Debug, Clone, Default)]
pub struct DnsResult {
    /// Deciding network rule, if any network rule matched
    pub basic_rule: Option<Arc<NetworkRule>>,
    /// Hosts-file rules for the hostname; empty when a network rule matched
    pub host_rules: Vec<Arc<HostRule>>,
}

impl DnsResult {
    pub fn is_blocked(&self) -> bool {
        match &self.basic_rule {
            Some(rule) => !rule.is_allowlist(),
            None => !self.host_rules.is_empty(),
        }
    }
}

/// Host-level network rules plus hosts-file rules.
pub struct DnsEngine {
    storage: RuleStorage,
    hashes: HashCache,
    psl: PublicSuffixes,
    network: NetworkEngine,
    host_rules: HashMap<u32, Vec<StorageIndex>>,
    host_rules_count: usize,
}

impl DnsEngine {
    pub fn new(storage: RuleStorage, options: &EngineOptions) -> Self {
        Self::with_public_suffixes(storage, options, PublicSuffixes::default())
    }

    pub fn with_public_suffixes(storage: RuleStorage, options: &EngineOptions, psl: PublicSuffixes) -> Self {
        let mut engine = Self {
            storage,
            hashes: HashCache::new(options.hash_cache_size),
            psl,
            network: NetworkEngine::new(),
            host_rules: HashMap::new(),
            host_rules_count: 0,
        };

        let scanner = engine.storage.create_scanner(ScanMode::NETWORK | ScanMode::HOST);
        for rule in scanner {
            engine.add_rule(&rule);
        }
        log::info!(
            "DNS engine built with {} network rules and {} host rules",
            engine.network.rules_count(),
            engine.host_rules_count
        );
        engine
    }

    fn add_rule(&mut self, rule: &ScannedRule) -> bool {
        match rule.parts() {
            RuleParts::Host(parts) => {
                let hostnames = parts.hostnames.of(rule.line());
                let mut seen = HashSet::new();
                for hostname in hostnames.split_whitespace() {
                    let hash = self.hashes.hash(&hostname.to_ascii_lowercase());
                    if seen.insert(hash) {
                        self.host_rules.entry(hash).or_default().push(rule.index);
                    }
                }
                if seen.is_empty() {
                    return false;
                }
                self.host_rules_count += 1;
                true
            }
            RuleParts::Network(_) => {
                let host_level = self
                    .storage
                    .retrieve_network_rule(rule.index)
                    .is_some_and(|network| network.is_host_level());
                if !host_level {
                    return false;
                }
                let mut ctx = TableContext {
                    storage: &mut self.storage,
                    hashes: &mut self.hashes,
                    psl: &self.psl,
                };
                self.network.add_rule(rule, &mut ctx)
            }
            RuleParts::Cosmetic(_) => false,
        }
    }

    /// Match a hostname. Network rules win outright when any of them
    /// matches; otherwise the hosts-file rules for the hostname are
    /// returned.
    pub fn match_hostname(&mut self, hostname: &str) -> DnsResult {
        let request = Request::hostname_only(hostname, &self.psl);
        let mut ctx = TableContext {
            storage: &mut self.storage,
            hashes: &mut self.hashes,
            psl: &self.psl,
        };

        let rules = self.network.match_all(&request, &mut ctx);
        if !rules.is_empty() {
            let result = MatchingResult::new(rules, None);
            return DnsResult {
                basic_rule: result.basic_rule().cloned(),
                host_rules: Vec::new(),
            };
        }

        let hash = ctx.hashes.hash(&request.hostname);
        let host_rules = self
            .host_rules
            .get(&hash)
            .into_iter()
            .flatten()
            .filter_map(|&index| ctx.storage.retrieve_host_rule(index))
            .filter(|rule| rule.matches(&request.hostname))
            .collect();

        DnsResult {
            basic_rule: None,
            host_rules,
        }
    }

    pub fn rules_count(&self) -> usize {
        self.network.rules_count() + self.host_rules_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_list::RuleList;

    fn engine(rules: &str) -> DnsEngine {
        let storage = RuleStorage::new(vec![RuleList::new(1, rules)]).unwrap();
        DnsEngine::new(storage, &EngineOptions::default())
    }

    #[test]
    fn host_rules_match_exact_hostname() {
        let mut engine = engine("0.0.0.0 ads.example.org Tracker.example.org # trackers\nbare.example.net\n");
        assert_eq!(engine.rules_count(), 2);

        let result = engine.match_hostname("tracker.example.org");
        assert!(result.basic_rule.is_none());
        assert_eq!(result.host_rules.len(), 1);
        assert_eq!(result.host_rules[0].ip(), Some("0.0.0.0".parse().unwrap()));
        assert!(result.is_blocked());

        // Without an IP the line is a plain network rule
        let result = engine.match_hostname("bare.example.net");
        assert_eq!(result.basic_rule.unwrap().text(), "bare.example.net");
        assert!(result.host_rules.is_empty());

        assert!(engine.match_hostname("sub.ads.example.org").host_rules.is_empty());
    }

    #[test]
    fn network_rules_win() {
        let mut engine = engine("||ads.example.org^\n0.0.0.0 ads.example.org\n@@||ok.example.org^\n0.0.0.0 ok.example.org\n");
        let result = engine.match_hostname("ads.example.org");
        assert_eq!(result.basic_rule.unwrap().text(), "||ads.example.org^");
        assert!(result.host_rules.is_empty());

        let result = engine.match_hostname("ok.example.org");
        assert!(result.basic_rule.as_ref().unwrap().is_allowlist());
        assert!(!result.is_blocked());
    }

    #[test]
    fn skips_request_specific_rules() {
        let mut engine = engine("||ads.example.org^$script\n||ads.example.org^$domain=news.org\n/banner/*\n");
        assert_eq!(engine.rules_count(), 0);
        assert!(!engine.match_hostname("ads.example.org").is_blocked());
    }

    #[test]
    fn badfilter_leaves_no_rule() {
        let mut engine = engine("||example.org^\n||example.org^$badfilter\n0.0.0.0 example.org\n");
        let result = engine.match_hostname("example.org");
        assert!(result.basic_rule.is_none());
        assert!(result.host_rules.is_empty());
    }
}
