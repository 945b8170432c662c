//! Conflict resolution over the network rules matching one request.

use std::sync::Arc;

use ns_rules::{NetworkRule, NetworkRuleOption};

use crate::cosmetic::CosmeticOption;

/// Drop every rule negated by a `$badfilter` rule in the same set, and the
/// `$badfilter` rules themselves.
pub fn remove_badfilter_rules(rules: Vec<Arc<NetworkRule>>) -> Vec<Arc<NetworkRule>> {
    let badfilters: Vec<Arc<NetworkRule>> = rules.iter().filter(|r| r.is_badfilter()).cloned().collect();
    if badfilters.is_empty() {
        return rules;
    }
    rules
        .into_iter()
        .filter(|rule| !rule.is_badfilter() && !badfilters.iter().any(|bad| bad.negates(rule)))
        .collect()
}

fn highest_priority<'a>(rules: impl Iterator<Item = &'a Arc<NetworkRule>>) -> Option<&'a Arc<NetworkRule>> {
    rules.max_by_key(|rule| rule.priority())
}

/// Outcome of network matching for one request.
#[derive(Debug, Clone)]
pub struct MatchingResult {
    rules: Vec<Arc<NetworkRule>>,
    basic_rule: Option<Arc<NetworkRule>>,
    document_rule: Option<Arc<NetworkRule>>,
    cosmetic_option: CosmeticOption,
}

impl MatchingResult {
    /// `source_rule` is the document-level rule of the enclosing frame, if
    /// any (see `Engine::match_frame`).
    pub fn new(rules: Vec<Arc<NetworkRule>>, source_rule: Option<Arc<NetworkRule>>) -> Self {
        let rules = remove_badfilter_rules(rules);
        let source_rule = source_rule.filter(|rule| rule.is_document_allowlist());

        let document_rule = highest_priority(rules.iter().filter(|r| r.is_document_allowlist()))
            .or(source_rule.as_ref())
            .cloned();

        let basic_rule = match &source_rule {
            Some(rule) => Some(Arc::clone(rule)),
            None => Self::resolve_basic(&rules),
        };

        let mut cosmetic_option = CosmeticOption::ALL;
        for rule in rules.iter().chain(source_rule.iter()) {
            if rule.is_allowlist() {
                cosmetic_option.remove(Self::disabled_cosmetics(rule));
            }
        }

        Self {
            rules,
            basic_rule,
            document_rule,
            cosmetic_option,
        }
    }

    /// Important allowlist, important block, allowlist, block: the first
    /// non-empty group wins, and within it the highest priority.
    fn resolve_basic(rules: &[Arc<NetworkRule>]) -> Option<Arc<NetworkRule>> {
        let candidates: Vec<&Arc<NetworkRule>> =
            rules.iter().filter(|r| !r.is_cosmetic_option_only()).collect();

        let groups: [(bool, bool); 4] = [(true, true), (true, false), (false, true), (false, false)];
        for (important, allowlist) in groups {
            let best = highest_priority(
                candidates
                    .iter()
                    .copied()
                    .filter(|r| r.is_important() == important && r.is_allowlist() == allowlist),
            );
            if let Some(rule) = best {
                return Some(Arc::clone(rule));
            }
        }
        None
    }

    fn disabled_cosmetics(rule: &NetworkRule) -> CosmeticOption {
        let options = rule.options();
        if options.contains(NetworkRuleOption::DOCUMENT) {
            return CosmeticOption::ALL;
        }

        let mut disabled = CosmeticOption::empty();
        if options.contains(NetworkRuleOption::ELEMHIDE) {
            disabled |= CosmeticOption::GENERIC_CSS | CosmeticOption::SPECIFIC_CSS;
        }
        if options.contains(NetworkRuleOption::GENERICHIDE) {
            disabled |= CosmeticOption::GENERIC_CSS;
        }
        if options.contains(NetworkRuleOption::SPECIFICHIDE) {
            disabled |= CosmeticOption::SPECIFIC_CSS;
        }
        if options.contains(NetworkRuleOption::JSINJECT) {
            disabled |= CosmeticOption::JS;
        }
        if options.contains(NetworkRuleOption::CONTENT) {
            disabled |= CosmeticOption::HTML;
        }
        disabled
    }

    /// The rule deciding whether the request is blocked. An allowlist rule
    /// means "let it through".
    pub fn basic_rule(&self) -> Option<&Arc<NetworkRule>> {
        self.basic_rule.as_ref()
    }

    /// Whether the request should be blocked.
    pub fn is_blocked(&self) -> bool {
        self.basic_rule.as_ref().is_some_and(|rule| !rule.is_allowlist())
    }

    pub fn document_allowlist_rule(&self) -> Option<&Arc<NetworkRule>> {
        self.document_rule.as_ref()
    }

    /// Cosmetic filtering still enabled for the page.
    pub fn cosmetic_option(&self) -> CosmeticOption {
        self.cosmetic_option
    }

    /// Matched rules after `$badfilter` removal.
    pub fn rules(&self) -> &[Arc<NetworkRule>] {
        &self.rules
    }
}
