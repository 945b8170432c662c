use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ns_core::{Request, StorageIndex};
use ns_rules::domain::is_wildcard_or_regex;
use ns_rules::options::split_unescaped;
use ns_rules::{CosmeticRule, ScriptletCall};

use crate::network::TableContext;
use crate::storage::ScannedRule;
use crate::tokenizer::{CosmeticParts, RuleParts};

/// Index for one cosmetic rule kind.
///
/// Blocking rules land in exactly one of three places: the domain map
/// (keyed by the registrable domain of each permitted domain), the generic
/// list, or the sequential list for wildcard and regex domains. Allowlist
/// rules are keyed by the content they disable.
#[derive(Debug, Default)]
pub struct CosmeticLookupTable {
    by_hostname: HashMap<u32, Vec<StorageIndex>>,
    generic: Vec<StorageIndex>,
    seq_scan: Vec<StorageIndex>,
    allowlist: HashMap<String, Vec<StorageIndex>>,
    pruned: HashSet<StorageIndex>,
    count: usize,
}

enum Placement {
    Generic,
    Sequential,
    Domains(Vec<String>),
}

fn placement(line: &str, parts: &CosmeticParts) -> Placement {
    let value = match parts.domains {
        Some(span) => span.of(line),
        None => return Placement::Generic,
    };

    let entries: Vec<&str> = split_unescaped(value, parts.domain_separator())
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    if entries.iter().all(|entry| entry.starts_with('~')) {
        return Placement::Generic;
    }
    if entries.iter().any(|entry| is_wildcard_or_regex(entry)) {
        return Placement::Sequential;
    }

    let permitted = entries
        .into_iter()
        .filter(|entry| !entry.starts_with('~'))
        .map(str::to_ascii_lowercase)
        .collect();
    Placement::Domains(permitted)
}

/// Allowlist key for an allowlist rule's content.
fn allowlist_key(content: &str) -> Option<String> {
    if !ScriptletCall::is_scriptlet(content) {
        return Some(content.to_string());
    }
    let call = ScriptletCall::parse(content).ok()?;
    if call.param_count() <= 1 {
        Some(call.name)
    } else {
        Some(call.canonical())
    }
}

impl CosmeticLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a cosmetic rule of this table's kind.
    pub fn add(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        let parts = match rule.parts() {
            RuleParts::Cosmetic(parts) => parts,
            _ => return false,
        };
        let line = rule.line();

        if parts.marker.allowlist {
            let key = match allowlist_key(parts.content.of(line)) {
                Some(key) => key,
                None => {
                    log::debug!("Skipping malformed scriptlet allowlist {line:?}");
                    return false;
                }
            };
            self.allowlist.entry(key).or_default().push(rule.index);
            self.count += 1;
            return true;
        }

        match placement(line, parts) {
            Placement::Generic => self.generic.push(rule.index),
            Placement::Sequential => self.seq_scan.push(rule.index),
            Placement::Domains(domains) => {
                let mut hashes: Vec<u32> = domains
                    .iter()
                    .map(|domain| ctx.hashes.hash(ctx.psl.registrable_domain(domain)))
                    .collect();
                hashes.sort_unstable();
                hashes.dedup();
                for hash in hashes {
                    self.by_hostname.entry(hash).or_default().push(rule.index);
                }
            }
        }
        self.count += 1;
        true
    }

    /// Forget `stale` indices, counting each once.
    fn prune(&mut self, stale: &HashSet<StorageIndex>) {
        for &index in stale {
            if self.pruned.insert(index) {
                self.count -= 1;
            }
        }
    }

    /// Retrieve `indices`, splitting off the ones that no longer materialize.
    fn materialize(
        indices: &[StorageIndex],
        ctx: &mut TableContext<'_>,
    ) -> (Vec<Arc<CosmeticRule>>, HashSet<StorageIndex>) {
        let mut rules = Vec::with_capacity(indices.len());
        let mut stale = HashSet::new();
        for &index in indices {
            match ctx.storage.retrieve_cosmetic_rule(index) {
                Some(rule) => rules.push(rule),
                None => {
                    stale.insert(index);
                }
            }
        }
        (rules, stale)
    }

    /// Generic rules matching `request` that are not allowlisted.
    pub fn match_generic(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<CosmeticRule>> {
        let (rules, stale) = Self::materialize(&self.generic, ctx);
        if !stale.is_empty() {
            self.prune(&stale);
            self.generic.retain(|index| !stale.contains(index));
        }
        rules
            .into_iter()
            .filter(|rule| rule.matches(request) && !self.is_allowlisted(request, rule, ctx))
            .collect()
    }

    /// Domain-specific rules matching `request` that are not allowlisted.
    pub fn find_by_hostname(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<CosmeticRule>> {
        let mut hashes = Vec::new();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for subdomain in &request.subdomains {
            let hash = ctx.hashes.hash(subdomain);
            if let Some(bucket) = self.by_hostname.get(&hash) {
                hashes.push(hash);
                candidates.extend(bucket.iter().copied().filter(|index| seen.insert(*index)));
            }
        }

        let (rules, stale) = Self::materialize(&candidates, ctx);
        if !stale.is_empty() {
            self.prune(&stale);
            for hash in hashes {
                if let Some(bucket) = self.by_hostname.get_mut(&hash) {
                    bucket.retain(|index| !stale.contains(index));
                }
            }
        }

        let (sequential, stale) = Self::materialize(&self.seq_scan, ctx);
        if !stale.is_empty() {
            self.prune(&stale);
            self.seq_scan.retain(|index| !stale.contains(index));
        }

        rules
            .into_iter()
            .chain(sequential)
            .filter(|rule| rule.matches(request) && !self.is_allowlisted(request, rule, ctx))
            .collect()
    }

    /// Whether an allowlist rule disables `rule` on this request.
    pub fn is_allowlisted(&self, request: &Request, rule: &CosmeticRule, ctx: &mut TableContext<'_>) -> bool {
        if self.allowlist.is_empty() {
            return false;
        }
        match rule.scriptlet() {
            Some(call) => {
                let mut keys = vec![String::new(), call.name.clone()];
                if !call.args.is_empty() {
                    keys.push(call.canonical());
                }
                keys.iter()
                    .any(|key| self.allowlist_hit(key, ctx, |allow| allow.is_generic() || allow.matches(request)))
            }
            None => self.allowlist_hit(rule.content(), ctx, |allow| allow.matches(request)),
        }
    }

    fn allowlist_hit(
        &self,
        key: &str,
        ctx: &mut TableContext<'_>,
        applies: impl Fn(&CosmeticRule) -> bool,
    ) -> bool {
        let indices = match self.allowlist.get(key) {
            Some(indices) => indices,
            None => return false,
        };
        indices.iter().any(|&index| {
            ctx.storage
                .retrieve_cosmetic_rule(index)
                .is_some_and(|allow| applies(allow.as_ref()))
        })
    }

    /// Number of rules owned, allowlist rules included.
    pub fn count(&self) -> usize {
        self.count
    }
}
