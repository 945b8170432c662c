//! Network (URL blocking) rules.
//!
//! ```text
//! @@||example.org^$script,third-party,domain=a.com|~b.a.com
//! ^^ ^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//! |  pattern       options
//! allowlist
//! ```

use ns_core::{MethodMask, Request, RequestType, StorageIndex};

use crate::domain::DomainModifier;
use crate::error::RuleError;
use crate::options::{find_options_start, split_unescaped};
use crate::pattern::Pattern;

bitflags::bitflags! {
    /// Boolean modifiers of a network rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NetworkRuleOption: u32 {
        const IMPORTANT = 1 << 0;
        const BADFILTER = 1 << 1;
        const MATCH_CASE = 1 << 2;
        /// `$document`
        const DOCUMENT = 1 << 3;
        const URLBLOCK = 1 << 4;
        const ELEMHIDE = 1 << 5;
        const GENERICHIDE = 1 << 6;
        const SPECIFICHIDE = 1 << 7;
        const JSINJECT = 1 << 8;
        const CONTENT = 1 << 9;

        /// Modifiers that only disable cosmetic filtering
        const COSMETIC_OPTIONS = Self::ELEMHIDE.bits()
            | Self::GENERICHIDE.bits()
            | Self::SPECIFICHIDE.bits()
            | Self::JSINJECT.bits()
            | Self::CONTENT.bits();
    }
}

/// Modifiers that rewrite requests or responses instead of blocking them.
const UNSAFE_MODIFIERS: &[&str] = &[
    "redirect",
    "redirect-rule",
    "removeparam",
    "removeheader",
    "csp",
    "replace",
    "permissions",
];

/// A request-rewriting modifier and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedModifier {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct NetworkRule {
    text: String,
    list_id: u32,
    index: Option<StorageIndex>,
    allowlist: bool,
    pattern: Pattern,
    options: NetworkRuleOption,
    permitted_types: RequestType,
    restricted_types: RequestType,
    permitted_methods: MethodMask,
    restricted_methods: MethodMask,
    third_party: Option<bool>,
    domains: Option<DomainModifier>,
    advanced: Option<AdvancedModifier>,
    /// For `$badfilter` rules: text of the rule being negated
    negated_text: Option<String>,
}

impl NetworkRule {
    pub fn parse(text: &str, list_id: u32) -> Result<Self, RuleError> {
        let text = text.trim();
        let (allowlist, body) = match text.strip_prefix("@@") {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (pattern_text, options_text) = match find_options_start(body) {
            Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
            None => (body, None),
        };

        let mut rule = Self {
            text: text.to_string(),
            list_id,
            index: None,
            allowlist,
            pattern: Pattern::parse("", false)?,
            options: NetworkRuleOption::empty(),
            permitted_types: RequestType::empty(),
            restricted_types: RequestType::empty(),
            permitted_methods: MethodMask::empty(),
            restricted_methods: MethodMask::empty(),
            third_party: None,
            domains: None,
            advanced: None,
            negated_text: None,
        };

        let mut kept_options = Vec::new();
        if let Some(options_text) = options_text {
            for raw in split_unescaped(options_text, ',') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                rule.apply_option(raw)?;
                if !raw.eq_ignore_ascii_case("badfilter") {
                    kept_options.push(raw);
                }
            }
        }

        rule.pattern = Pattern::parse(pattern_text, rule.options.contains(NetworkRuleOption::MATCH_CASE))?;

        if rule.options.contains(NetworkRuleOption::BADFILTER) {
            let prefix = &text[..text.len() - body.len()];
            let mut negated = format!("{prefix}{}", pattern_text.trim());
            if !kept_options.is_empty() {
                negated.push('$');
                negated.push_str(&kept_options.join(","));
            }
            rule.negated_text = Some(negated);
        }

        // Cosmetic-option and $urlblock allowlists apply to documents only
        let document_scoped = NetworkRuleOption::COSMETIC_OPTIONS | NetworkRuleOption::URLBLOCK;
        if rule.options.intersects(document_scoped) && rule.permitted_types.is_empty() {
            rule.permitted_types = RequestType::ANY_DOCUMENT;
        }

        if rule.pattern.is_any() && !rule.is_restricted() {
            return Err(RuleError::TooWide(text.to_string()));
        }

        Ok(rule)
    }

    fn apply_option(&mut self, raw: &str) -> Result<(), RuleError> {
        let (name, value) = match raw.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (raw, None),
        };
        let lower = name.to_ascii_lowercase();
        let (negated, lower) = match lower.strip_prefix('~') {
            Some(rest) => (true, rest.to_string()),
            None => (false, lower.clone()),
        };

        let invalid_value = || RuleError::InvalidModifierValue {
            name: lower.clone(),
            value: value.unwrap_or_default().to_string(),
        };

        match (lower.as_str(), value) {
            ("domain", Some(value)) if !negated => {
                self.domains = Some(DomainModifier::parse(value, '|')?);
            }
            ("method", Some(value)) if !negated => {
                for method in split_unescaped(value, '|') {
                    let method = method.trim();
                    let (neg, name) = match method.strip_prefix('~') {
                        Some(rest) => (true, rest),
                        None => (false, method),
                    };
                    let mask = MethodMask::from_method_name(name).ok_or_else(invalid_value)?;
                    if neg {
                        self.restricted_methods |= mask;
                    } else {
                        self.permitted_methods |= mask;
                    }
                }
            }
            ("third-party" | "3p", None) => self.third_party = Some(!negated),
            ("first-party" | "1p", None) => self.third_party = Some(negated),
            ("important", None) if !negated => self.options |= NetworkRuleOption::IMPORTANT,
            ("badfilter", None) if !negated => self.options |= NetworkRuleOption::BADFILTER,
            ("match-case", None) if !negated => self.options |= NetworkRuleOption::MATCH_CASE,
            (
                "elemhide" | "ehide" | "generichide" | "ghide" | "specifichide" | "shide"
                | "jsinject" | "content" | "urlblock",
                None,
            ) if !negated => {
                if !self.allowlist {
                    return Err(RuleError::AllowlistOnlyModifier(lower.clone()));
                }
                self.options |= match lower.as_str() {
                    "elemhide" | "ehide" => NetworkRuleOption::ELEMHIDE,
                    "generichide" | "ghide" => NetworkRuleOption::GENERICHIDE,
                    "specifichide" | "shide" => NetworkRuleOption::SPECIFICHIDE,
                    "jsinject" => NetworkRuleOption::JSINJECT,
                    "content" => NetworkRuleOption::CONTENT,
                    _ => NetworkRuleOption::URLBLOCK,
                };
            }
            (name, None) if RequestType::from_modifier(name).is_some() => {
                let mask = RequestType::from_modifier(name).unwrap_or(RequestType::empty());
                if negated {
                    self.restricted_types |= mask;
                } else {
                    self.permitted_types |= mask;
                    if mask == RequestType::DOCUMENT {
                        self.options |= NetworkRuleOption::DOCUMENT;
                    }
                }
            }
            (name, value) if !negated && UNSAFE_MODIFIERS.contains(&name) => {
                self.advanced = Some(AdvancedModifier {
                    name: name.to_string(),
                    value: value.unwrap_or_default().to_string(),
                });
            }
            (_, Some(_)) if matches!(lower.as_str(), "domain" | "method") => {
                return Err(invalid_value());
            }
            _ => return Err(RuleError::UnknownModifier(raw.to_string())),
        }
        Ok(())
    }

    /// Whether any modifier narrows which requests can match.
    fn is_restricted(&self) -> bool {
        self.domains.is_some()
            || self.third_party.is_some()
            || !self.permitted_types.is_empty()
            || !self.restricted_types.is_empty()
            || !self.permitted_methods.is_empty()
            || !self.restricted_methods.is_empty()
            || self.options.contains(NetworkRuleOption::BADFILTER)
    }

    pub fn with_index(mut self, index: Option<StorageIndex>) -> Self {
        self.index = index;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn list_id(&self) -> u32 {
        self.list_id
    }

    pub fn index(&self) -> Option<StorageIndex> {
        self.index
    }

    pub fn is_allowlist(&self) -> bool {
        self.allowlist
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn options(&self) -> NetworkRuleOption {
        self.options
    }

    pub fn domains(&self) -> Option<&DomainModifier> {
        self.domains.as_ref()
    }

    pub fn permitted_types(&self) -> RequestType {
        self.permitted_types
    }

    pub fn advanced(&self) -> Option<&AdvancedModifier> {
        self.advanced.as_ref()
    }

    pub fn is_important(&self) -> bool {
        self.options.contains(NetworkRuleOption::IMPORTANT)
    }

    pub fn is_badfilter(&self) -> bool {
        self.options.contains(NetworkRuleOption::BADFILTER)
    }

    /// Rules that rewrite rather than block.
    pub fn is_unsafe(&self) -> bool {
        self.advanced.is_some()
    }

    /// `$document` / `$urlblock` allowlist.
    pub fn is_document_allowlist(&self) -> bool {
        self.allowlist
            && self
                .options
                .intersects(NetworkRuleOption::DOCUMENT | NetworkRuleOption::URLBLOCK)
    }

    /// Cosmetic-option modifiers carried by the rule.
    pub fn cosmetic_options(&self) -> NetworkRuleOption {
        self.options & NetworkRuleOption::COSMETIC_OPTIONS
    }

    /// Rules whose only effect is disabling cosmetic filtering.
    pub fn is_cosmetic_option_only(&self) -> bool {
        !self.cosmetic_options().is_empty() && !self.is_document_allowlist()
    }

    /// Whether `self` is a `$badfilter` rule cancelling `other`.
    pub fn negates(&self, other: &NetworkRule) -> bool {
        self.negated_text.as_deref() == Some(other.text())
    }

    /// Whether the rule can be decided from a hostname alone.
    pub fn is_host_level(&self) -> bool {
        if self.domains.is_some()
            || self.third_party.is_some()
            || !self.permitted_types.is_empty()
            || !self.restricted_types.is_empty()
            || !self.permitted_methods.is_empty()
            || !self.restricted_methods.is_empty()
            || self.advanced.is_some()
            || self.options.intersects(NetworkRuleOption::MATCH_CASE | NetworkRuleOption::COSMETIC_OPTIONS)
        {
            return false;
        }

        let text = self.pattern.text();
        if self.pattern.is_regex_literal() || text.is_empty() {
            return false;
        }
        let host = text.trim_start_matches('|').trim_end_matches(['^', '|']);
        !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
    }

    /// Specificity used to pick between rules of the same group.
    pub fn priority(&self) -> u32 {
        let mut priority = 1;
        if !self.permitted_types.is_empty() {
            // Fewer permitted types is more specific
            priority += 50 / self.permitted_types.bits().count_ones().max(1);
        }
        if !self.restricted_types.is_empty() {
            priority += 1;
        }
        if self.third_party.is_some() {
            priority += 1;
        }
        if !self.permitted_methods.is_empty() || !self.restricted_methods.is_empty() {
            priority += 1;
        }
        if let Some(domains) = &self.domains {
            priority += if domains.has_permitted() { 100 } else { 1 };
        }
        if self.options.contains(NetworkRuleOption::MATCH_CASE) {
            priority += 1;
        }
        if self.advanced.is_some() {
            priority += 1;
        }
        priority
    }

    // =========================================================================
    // Matching
    // =========================================================================

    pub fn matches(&self, request: &Request) -> bool {
        if request.is_hostname_request {
            if !self.is_host_level() {
                return false;
            }
        } else if !self.matches_request_type(request.request_type)
            || !self.matches_third_party(request)
            || !self.matches_method(request)
        {
            return false;
        }

        if let Some(domains) = &self.domains {
            if !domains.matches_domain(request.context_hostname()) {
                return false;
            }
        }

        self.pattern.matches(request)
    }

    fn matches_request_type(&self, request_type: RequestType) -> bool {
        if !self.permitted_types.is_empty() && !self.permitted_types.intersects(request_type) {
            return false;
        }
        !self.restricted_types.intersects(request_type)
    }

    fn matches_third_party(&self, request: &Request) -> bool {
        match self.third_party {
            // No source counts as first party
            Some(expected) => request.third_party.unwrap_or(false) == expected,
            None => true,
        }
    }

    fn matches_method(&self, request: &Request) -> bool {
        if self.permitted_methods.is_empty() && self.restricted_methods.is_empty() {
            return true;
        }
        let method = match request.method {
            Some(method) => method,
            None => return self.permitted_methods.is_empty(),
        };
        if !self.permitted_methods.is_empty() && !self.permitted_methods.intersects(method) {
            return false;
        }
        !self.restricted_methods.intersects(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::PublicSuffixes;

    fn request(url: &str, source: Option<&str>, request_type: RequestType) -> Request {
        Request::new(url, source, request_type, &PublicSuffixes::default())
    }

    #[test]
    fn parses_basic_rule() {
        let rule = NetworkRule::parse("||ads.example.com^", 3).unwrap();
        assert!(!rule.is_allowlist());
        assert_eq!(rule.list_id(), 3);
        assert_eq!(rule.pattern().hostname(), Some("ads.example.com"));
        assert!(rule.is_host_level());
        assert!(rule.matches(&request("https://ads.example.com/x.js", None, RequestType::SCRIPT)));
    }

    #[test]
    fn parses_allowlist_and_types() {
        let rule = NetworkRule::parse("@@||example.com/ads/$image,~script", 0).unwrap();
        assert!(rule.is_allowlist());
        assert!(!rule.is_host_level());
        assert!(rule.matches(&request("https://example.com/ads/1.png", None, RequestType::IMAGE)));
        assert!(!rule.matches(&request("https://example.com/ads/1.js", None, RequestType::SCRIPT)));
    }

    #[test]
    fn third_party_modifier() {
        let rule = NetworkRule::parse("||tracker.org^$third-party", 0).unwrap();
        let third = request("https://tracker.org/p", Some("https://news.com/"), RequestType::IMAGE);
        let first = request("https://tracker.org/p", Some("https://www.tracker.org/"), RequestType::IMAGE);
        assert!(rule.matches(&third));
        assert!(!rule.matches(&first));

        let rule = NetworkRule::parse("||tracker.org^$~third-party", 0).unwrap();
        assert!(!rule.matches(&third));
        assert!(rule.matches(&first));
    }

    #[test]
    fn sourceless_request_is_first_party() {
        let direct = request("https://tracker.org/p", None, RequestType::IMAGE);
        assert!(!NetworkRule::parse("||tracker.org^$third-party", 0).unwrap().matches(&direct));
        assert!(NetworkRule::parse("||tracker.org^$first-party", 0).unwrap().matches(&direct));
        assert!(NetworkRule::parse("||tracker.org^$~third-party", 0).unwrap().matches(&direct));
    }

    #[test]
    fn domain_modifier_uses_source() {
        let rule = NetworkRule::parse("/banner.$domain=news.com|~sport.news.com", 0).unwrap();
        let on_news = request("https://cdn.org/banner.gif", Some("https://news.com/"), RequestType::IMAGE);
        let on_sport = request("https://cdn.org/banner.gif", Some("https://sport.news.com/"), RequestType::IMAGE);
        assert!(rule.matches(&on_news));
        assert!(!rule.matches(&on_sport));
        assert!(rule.priority() > NetworkRule::parse("/banner.", 0).unwrap().priority());
    }

    #[test]
    fn method_modifier() {
        let rule = NetworkRule::parse("||api.example.com^$method=post|put", 0).unwrap();
        let get = request("https://api.example.com/", None, RequestType::XMLHTTPREQUEST).with_method(MethodMask::GET);
        let post = request("https://api.example.com/", None, RequestType::XMLHTTPREQUEST).with_method(MethodMask::POST);
        assert!(!rule.matches(&get));
        assert!(rule.matches(&post));
    }

    #[test]
    fn badfilter_negation() {
        let rule = NetworkRule::parse("||example.org^$script", 0).unwrap();
        let badfilter = NetworkRule::parse("||example.org^$script,badfilter", 0).unwrap();
        assert!(badfilter.is_badfilter());
        assert!(badfilter.negates(&rule));
        assert!(!rule.negates(&badfilter));

        let other = NetworkRule::parse("||example.org^$image", 0).unwrap();
        assert!(!badfilter.negates(&other));

        let bare = NetworkRule::parse("||example.org^", 0).unwrap();
        let bare_bad = NetworkRule::parse("||example.org^$badfilter", 0).unwrap();
        assert!(bare_bad.negates(&bare));
        assert!(bare_bad.is_host_level());
    }

    #[test]
    fn cosmetic_option_rules() {
        let rule = NetworkRule::parse("@@||example.org^$generichide", 0).unwrap();
        assert!(rule.is_cosmetic_option_only());
        assert_eq!(rule.permitted_types(), RequestType::ANY_DOCUMENT);
        assert!(!rule.matches(&request("https://example.org/a.js", None, RequestType::SCRIPT)));
        assert!(rule.matches(&request("https://example.org/", None, RequestType::DOCUMENT)));

        assert!(matches!(
            NetworkRule::parse("||example.org^$elemhide", 0),
            Err(RuleError::AllowlistOnlyModifier(_))
        ));
    }

    #[test]
    fn document_allowlist() {
        let rule = NetworkRule::parse("@@||example.org^$document", 0).unwrap();
        assert!(rule.is_document_allowlist());
        assert!(!rule.is_cosmetic_option_only());
        let rule = NetworkRule::parse("@@||example.org^$urlblock", 0).unwrap();
        assert!(rule.is_document_allowlist());
    }

    #[test]
    fn unsafe_modifiers() {
        let rule = NetworkRule::parse("||example.org^$removeparam=utm_source", 0).unwrap();
        assert!(rule.is_unsafe());
        assert_eq!(rule.advanced().unwrap().value, "utm_source");
        assert!(!rule.is_host_level());
    }

    #[test]
    fn rejects_invalid_rules() {
        assert!(matches!(
            NetworkRule::parse("||example.org^$bogus", 0),
            Err(RuleError::UnknownModifier(_))
        ));
        assert!(matches!(
            NetworkRule::parse("||example.org^$method=brew", 0),
            Err(RuleError::InvalidModifierValue { .. })
        ));
        assert!(matches!(NetworkRule::parse("*", 0), Err(RuleError::TooWide(_))));
        assert!(NetworkRule::parse("*$domain=example.org", 0).is_ok());
    }

    #[test]
    fn hostname_request_skips_typed_rules() {
        let psl = PublicSuffixes::default();
        let dns = Request::hostname_only("ads.example.com", &psl);
        assert!(NetworkRule::parse("||example.com^", 0).unwrap().matches(&dns));
        assert!(!NetworkRule::parse("||example.com^$script", 0).unwrap().matches(&dns));
        assert!(!NetworkRule::parse("||example.com/ads^", 0).unwrap().matches(&dns));
    }
}
