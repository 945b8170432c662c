//! Cosmetic rules: element hiding, CSS injection, scriptlets, HTML filtering.
//!
//! ```text
//! [$path=/page,domain=a.com|b.com]example.org#@$?#.ad { display: none }
//! ```
//!
//! The optional `[$...]` block carries `path` and `domain` modifiers; when it
//! has no `domain`, the text between `]` and the marker is the domain list.

use std::sync::OnceLock;

use ns_core::{Request, StorageIndex};
use regex::Regex;

use crate::domain::DomainModifier;
use crate::error::RuleError;
use crate::marker::{find_marker, CosmeticKind};
use crate::options::{split_unescaped, unescape};
use crate::pattern::{is_regex_literal, wildcard_to_regex};
use crate::scriptlet::ScriptletCall;

// =============================================================================
// Path Modifier
// =============================================================================

/// `$path=` matcher against the request path and query.
#[derive(Debug)]
pub struct PathPattern {
    text: String,
    regex_source: Option<String>,
    regex: OnceLock<Option<Regex>>,
}

impl Clone for PathPattern {
    fn clone(&self) -> Self {
        Self {
            text: self.text.clone(),
            regex_source: self.regex_source.clone(),
            regex: OnceLock::new(),
        }
    }
}

impl PathPattern {
    pub fn parse(value: &str) -> Self {
        let text = unescape(value.trim(), ',');
        let regex_source = if is_regex_literal(&text) {
            Some(text[1..text.len() - 1].to_string())
        } else if text.contains(['*', '^', '|']) {
            Some(wildcard_to_regex(&text, true))
        } else {
            None
        };
        Self {
            text,
            regex_source,
            regex: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, path: &str) -> bool {
        let source = match &self.regex_source {
            Some(source) => source,
            None => return path.contains(self.text.as_str()),
        };
        let compiled = self.regex.get_or_init(|| match Regex::new(source) {
            Ok(re) => Some(re),
            Err(e) => {
                log::debug!("Invalid $path regex {:?}: {}", self.text, e);
                None
            }
        });
        compiled.as_ref().is_some_and(|re| re.is_match(path))
    }
}

// =============================================================================
// Cosmetic Rule
// =============================================================================

#[derive(Debug, Clone)]
pub struct CosmeticRule {
    text: String,
    list_id: u32,
    index: Option<StorageIndex>,
    kind: CosmeticKind,
    allowlist: bool,
    extended: bool,
    content: String,
    domains: Option<DomainModifier>,
    path: Option<PathPattern>,
    scriptlet: Option<ScriptletCall>,
}

/// Values of a leading `[$...]` modifier block.
struct BracketModifiers<'a> {
    domain: Option<&'a str>,
    path: Option<&'a str>,
    /// Text between `]` and the marker
    rest: &'a str,
}

/// Split a `[$path=...,domain=...]rest` prefix.
fn parse_bracket_modifiers(prefix: &str) -> Result<BracketModifiers<'_>, RuleError> {
    let invalid = || RuleError::InvalidCosmetic(prefix.to_string());
    let close = prefix.rfind(']').ok_or_else(invalid)?;
    let inner = prefix
        .get(..close)
        .and_then(|p| p.strip_prefix("[$"))
        .ok_or_else(invalid)?;

    let mut modifiers = BracketModifiers {
        domain: None,
        path: None,
        rest: &prefix[close + 1..],
    };
    for part in split_unescaped(inner, ',') {
        let (name, value) = part.split_once('=').ok_or_else(invalid)?;
        match name.trim() {
            "domain" => modifiers.domain = Some(value),
            "path" => modifiers.path = Some(value),
            other => return Err(RuleError::UnknownModifier(other.to_string())),
        }
    }
    Ok(modifiers)
}

impl CosmeticRule {
    pub fn parse(text: &str, list_id: u32) -> Result<Self, RuleError> {
        let text = text.trim();
        let marker = find_marker(text).ok_or_else(|| RuleError::InvalidCosmetic(text.to_string()))?;

        let content = text[marker.end()..].trim();
        if content.is_empty() {
            return Err(RuleError::InvalidCosmetic(text.to_string()));
        }

        let prefix = &text[..marker.start];
        let (domain_list, separator, path) = if prefix.starts_with('[') {
            let modifiers = parse_bracket_modifiers(prefix)?;
            match modifiers.domain {
                Some(domain) => (domain, '|', modifiers.path),
                None => (modifiers.rest, ',', modifiers.path),
            }
        } else {
            (prefix, ',', None)
        };

        let domains = if domain_list.trim().is_empty() {
            None
        } else {
            Some(DomainModifier::parse(domain_list, separator)?)
        };

        let scriptlet = match marker.kind {
            CosmeticKind::Js if ScriptletCall::is_scriptlet(content) => Some(ScriptletCall::parse(content)?),
            _ => None,
        };

        validate_content(marker.kind, marker.extended, content)
            .map_err(|reason| RuleError::InvalidCosmetic(format!("{reason}: {text}")))?;

        Ok(Self {
            text: text.to_string(),
            list_id,
            index: None,
            kind: marker.kind,
            allowlist: marker.allowlist,
            extended: marker.extended,
            content: content.to_string(),
            domains,
            path: path.map(PathPattern::parse),
            scriptlet,
        })
    }

    pub fn with_index(mut self, index: Option<StorageIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn list_id(&self) -> u32 {
        self.list_id
    }

    pub fn index(&self) -> Option<StorageIndex> {
        self.index
    }

    pub fn kind(&self) -> CosmeticKind {
        self.kind
    }

    pub fn is_allowlist(&self) -> bool {
        self.allowlist
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Selector, style block, script or HTML selector.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn domains(&self) -> Option<&DomainModifier> {
        self.domains.as_ref()
    }

    pub fn path(&self) -> Option<&PathPattern> {
        self.path.as_ref()
    }

    pub fn scriptlet(&self) -> Option<&ScriptletCall> {
        self.scriptlet.as_ref()
    }

    /// No permitted domains: applies everywhere it is not excluded.
    pub fn is_generic(&self) -> bool {
        self.domains.as_ref().map_or(true, |d| !d.has_permitted())
    }

    pub fn matches(&self, request: &Request) -> bool {
        if let Some(domains) = &self.domains {
            if !domains.matches_domain(&request.hostname) {
                return false;
            }
        }
        match &self.path {
            Some(path) => path.matches(&request.path),
            None => true,
        }
    }
}

fn validate_content(kind: CosmeticKind, extended: bool, content: &str) -> Result<(), &'static str> {
    match kind {
        CosmeticKind::ElementHiding => {
            if content.contains('{') && content.ends_with('}') && !extended {
                return Err("style block in element hiding rule");
            }
        }
        CosmeticKind::Css => {
            if !content.contains('{') || !content.ends_with('}') {
                return Err("missing style block");
            }
            if content.to_ascii_lowercase().contains("url(") {
                return Err("url() in injected style");
            }
        }
        CosmeticKind::Js | CosmeticKind::Html => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::{PublicSuffixes, RequestType};

    fn request(url: &str) -> Request {
        Request::new(url, None, RequestType::DOCUMENT, &PublicSuffixes::default())
    }

    #[test]
    fn parses_element_hiding() {
        let rule = CosmeticRule::parse("example.org,~sub.example.org##.banner", 2).unwrap();
        assert_eq!(rule.kind(), CosmeticKind::ElementHiding);
        assert_eq!(rule.content(), ".banner");
        assert!(!rule.is_generic());
        assert!(rule.matches(&request("https://www.example.org/")));
        assert!(!rule.matches(&request("https://sub.example.org/")));
    }

    #[test]
    fn generic_rules() {
        let rule = CosmeticRule::parse("##.ad", 0).unwrap();
        assert!(rule.is_generic());
        assert!(rule.matches(&request("https://anything.com/")));

        let rule = CosmeticRule::parse("~example.org##.ad", 0).unwrap();
        assert!(rule.is_generic());
        assert!(!rule.matches(&request("https://example.org/")));
    }

    #[test]
    fn parses_allowlist_and_css() {
        let rule = CosmeticRule::parse("example.org#@$#.ad { color: red }", 0).unwrap();
        assert!(rule.is_allowlist());
        assert_eq!(rule.kind(), CosmeticKind::Css);

        assert!(CosmeticRule::parse("example.org#$#.ad", 0).is_err());
        assert!(CosmeticRule::parse("example.org#$#.ad { background: url(x) }", 0).is_err());
        assert!(CosmeticRule::parse("example.org##", 0).is_err());
    }

    #[test]
    fn parses_scriptlets() {
        let rule = CosmeticRule::parse("example.org#%#//scriptlet('set-cookie','a','1')", 0).unwrap();
        let call = rule.scriptlet().unwrap();
        assert_eq!(call.name, "set-cookie");

        let rule = CosmeticRule::parse("example.org#%#window.ads = false;", 0).unwrap();
        assert!(rule.scriptlet().is_none());

        assert!(CosmeticRule::parse("example.org#%#//scriptlet('broken", 0).is_err());
    }

    #[test]
    fn parses_bracket_modifiers() {
        let rule = CosmeticRule::parse("[$path=/page,domain=a.com|b.com]##.ad", 0).unwrap();
        assert_eq!(rule.path().unwrap().text(), "/page");
        assert_eq!(rule.domains().unwrap().permitted_domains().count(), 2);

        let rule = CosmeticRule::parse("[$path=/page]example.org##.ad", 0).unwrap();
        assert!(rule.matches(&request("https://example.org/page?x=1")));
        assert!(!rule.matches(&request("https://example.org/other")));
        assert!(!rule.matches(&request("https://other.org/page")));

        assert!(CosmeticRule::parse("[$bogus=1]example.org##.ad", 0).is_err());
        assert!(CosmeticRule::parse("[path=/x]example.org##.ad", 0).is_err());
    }

    #[test]
    fn path_patterns() {
        assert!(PathPattern::parse("/subpage1").matches("/subpage1"));
        assert!(PathPattern::parse("/sub*1").matches("/subpage1"));
        assert!(!PathPattern::parse("/other*").matches("/subpage1"));
        assert!(PathPattern::parse(r"/^\/subpage\d$/").matches("/subpage1"));
        assert!(!PathPattern::parse(r"/^\/subpage\d\d$/").matches("/subpage1"));
        assert!(PathPattern::parse(r"/^\/a\,b$/").matches("/a,b"));
    }

    #[test]
    fn parses_html_rules() {
        let rule = CosmeticRule::parse("example.org$$script[tag-content=\"ads\"]", 0).unwrap();
        assert_eq!(rule.kind(), CosmeticKind::Html);
        assert!(!rule.is_allowlist());
    }
}
