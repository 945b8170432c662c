//! Lightweight rule classifier.
//!
//! [`tokenize`] decides what kind of rule a line holds and records where its
//! pieces live, without building a rule object. Lookup tables index rules
//! from these offsets; the full parse happens lazily in [`RuleStorage`].
//!
//! [`RuleStorage`]: crate::storage::RuleStorage

use std::net::IpAddr;

use ns_rules::marker::{find_marker, CosmeticKind, Marker};
use ns_rules::options::{find_modifier_value, find_options_start, split_unescaped};
use ns_rules::MIN_RULE_LENGTH;

/// Byte range inside the tokenized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The substring of `line` covered by this span.
    #[inline]
    pub fn of<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostParts {
    pub ip: Span,
    /// Whitespace-separated hostnames, comment excluded
    pub hostnames: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParts {
    pub allowlist: bool,
    pub pattern: Span,
    /// Everything after the options `$`
    pub modifiers: Option<Span>,
    /// Value of `domain=`
    pub domains: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosmeticParts {
    /// Marker position in the line
    pub marker: Marker,
    pub content: Span,
    pub domains: Option<Span>,
    /// Inside of a leading `[$...]` block
    pub modifiers: Option<Span>,
    /// `domains` came from `[$domain=...]` (`|`-separated) rather than the
    /// plain prefix (`,`-separated)
    pub domains_in_modifier: bool,
}

impl CosmeticParts {
    pub fn kind(&self) -> CosmeticKind {
        self.marker.kind
    }

    /// Separator of the domain list.
    pub fn domain_separator(&self) -> char {
        if self.domains_in_modifier {
            '|'
        } else {
            ','
        }
    }
}

/// Classification of one rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleParts {
    Host(HostParts),
    Network(NetworkParts),
    Cosmetic(CosmeticParts),
}

impl RuleParts {
    pub fn is_allowlist(&self) -> bool {
        match self {
            RuleParts::Host(_) => false,
            RuleParts::Network(parts) => parts.allowlist,
            RuleParts::Cosmetic(parts) => parts.marker.allowlist,
        }
    }
}

/// Classify `line`. Returns `None` for comments, too-short and malformed
/// lines, and for cosmetic rules when `ignore_cosmetic` is set.
pub fn tokenize(line: &str, ignore_cosmetic: bool, ignore_host: bool) -> Option<RuleParts> {
    let start = line.len() - line.trim_start().len();
    let end = line.trim_end().len();
    if end <= start {
        return None;
    }
    let trimmed = &line[start..end];
    if trimmed.len() < MIN_RULE_LENGTH || trimmed.starts_with('!') {
        return None;
    }

    if let Some(marker) = find_marker(trimmed) {
        if ignore_cosmetic {
            return None;
        }
        return tokenize_cosmetic(line, start, end, marker);
    }

    if trimmed.starts_with('[') || trimmed.starts_with('#') {
        return None;
    }

    tokenize_network(line, start, end, ignore_host)
}

fn tokenize_cosmetic(line: &str, start: usize, end: usize, marker: Marker) -> Option<RuleParts> {
    let marker = Marker {
        start: start + marker.start,
        ..marker
    };

    let content = trim_span(line, Span::new(marker.end(), end));
    if content.is_empty() {
        return None;
    }

    let prefix = Span::new(start, marker.start);
    let mut modifiers = None;
    let mut domains_in_modifier = false;
    let mut domain_source = prefix;

    if prefix.of(line).starts_with('[') {
        let text = prefix.of(line);
        let close = text.rfind(']')?;
        if !text.starts_with("[$") {
            return None;
        }
        let inner = Span::new(prefix.start + 2, prefix.start + close);
        let inner_text = inner.of(line);
        if inner_text.trim().is_empty() || split_unescaped(inner_text, ',').iter().any(|part| !part.contains('=')) {
            return None;
        }
        modifiers = Some(inner);

        match find_modifier_value(inner_text, "domain") {
            Some((value_start, value_end)) => {
                domain_source = Span::new(inner.start + value_start, inner.start + value_end);
                domains_in_modifier = true;
            }
            None => domain_source = Span::new(prefix.start + close + 1, prefix.end),
        }
    }

    let domains = trim_span(line, domain_source);
    Some(RuleParts::Cosmetic(CosmeticParts {
        marker,
        content,
        domains: (!domains.is_empty()).then_some(domains),
        modifiers,
        domains_in_modifier,
    }))
}

fn tokenize_network(line: &str, start: usize, end: usize, ignore_host: bool) -> Option<RuleParts> {
    let trimmed = &line[start..end];
    let allowlist = trimmed.starts_with("@@");
    let body_start = if allowlist { start + 2 } else { start };
    let body = &line[body_start..end];

    let parts = match find_options_start(body) {
        Some(idx) => {
            let options = Span::new(body_start + idx + 1, end);
            let domains = find_modifier_value(options.of(line), "domain")
                .map(|(s, e)| Span::new(options.start + s, options.start + e));
            NetworkParts {
                allowlist,
                pattern: Span::new(body_start, body_start + idx),
                modifiers: Some(options),
                domains,
            }
        }
        None => {
            if !ignore_host && !allowlist && trimmed.contains(char::is_whitespace) {
                if let Some(host) = tokenize_host(line, start, end) {
                    return Some(RuleParts::Host(host));
                }
            }
            NetworkParts {
                allowlist,
                pattern: Span::new(body_start, end),
                modifiers: None,
                domains: None,
            }
        }
    };
    Some(RuleParts::Network(parts))
}

fn tokenize_host(line: &str, start: usize, end: usize) -> Option<HostParts> {
    let end = match line[start..end].find('#') {
        Some(idx) => start + idx,
        None => end,
    };
    let body = trim_span(line, Span::new(start, end));
    let text = body.of(line);

    let ip_len = text.find(char::is_whitespace)?;
    let ip = Span::new(body.start, body.start + ip_len);
    ip.of(line).parse::<IpAddr>().ok()?;

    let hostnames = trim_span(line, Span::new(ip.end, body.end));
    if hostnames.is_empty() {
        return None;
    }
    Some(HostParts { ip, hostnames })
}

/// Shrink `span` to exclude surrounding whitespace.
fn trim_span(line: &str, span: Span) -> Span {
    let text = span.of(line);
    let start = span.start + (text.len() - text.trim_start().len());
    let end = span.start + text.trim_end().len();
    if end <= start {
        Span::new(start, start)
    } else {
        Span::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosmetic(line: &str) -> CosmeticParts {
        match tokenize(line, false, false) {
            Some(RuleParts::Cosmetic(parts)) => parts,
            other => panic!("expected cosmetic parts for {line:?}, got {other:?}"),
        }
    }

    fn network(line: &str) -> NetworkParts {
        match tokenize(line, false, false) {
            Some(RuleParts::Network(parts)) => parts,
            other => panic!("expected network parts for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn cosmetic_offsets_reproduce_substrings() {
        let line = "example.com##.ad";
        let parts = cosmetic(line);
        assert_eq!(parts.domains.unwrap().of(line), "example.com");
        assert_eq!(&line[parts.marker.start..parts.marker.end()], "##");
        assert_eq!(parts.content.of(line), ".ad");
        assert_eq!(parts.kind(), CosmeticKind::ElementHiding);
        assert!(!parts.marker.allowlist);
    }

    #[test]
    fn offsets_account_for_surrounding_whitespace() {
        let line = "  example.com#@#  .ad  ";
        let parts = cosmetic(line);
        assert_eq!(parts.domains.unwrap().of(line), "example.com");
        assert_eq!(&line[parts.marker.start..parts.marker.end()], "#@#");
        assert_eq!(parts.content.of(line), ".ad");
        assert!(parts.marker.allowlist);
    }

    #[test]
    fn generic_cosmetic_has_no_domains() {
        let parts = cosmetic("##.banner");
        assert!(parts.domains.is_none());
    }

    #[test]
    fn bracket_modifiers() {
        let line = "[$path=/page,domain=a.com|b.com]##.ad";
        let parts = cosmetic(line);
        assert_eq!(parts.domains.unwrap().of(line), "a.com|b.com");
        assert_eq!(parts.modifiers.unwrap().of(line), "path=/page,domain=a.com|b.com");
        assert_eq!(parts.domain_separator(), '|');

        let line = "[$path=/page]example.org##.ad";
        let parts = cosmetic(line);
        assert_eq!(parts.domains.unwrap().of(line), "example.org");
        assert_eq!(parts.domain_separator(), ',');

        assert!(tokenize("[path=/page]example.org##.ad", false, false).is_none());
        assert!(tokenize("[$path]example.org##.ad", false, false).is_none());
        assert!(tokenize("[Adblock Plus 2.0]", false, false).is_none());
    }

    #[test]
    fn scriptlet_and_html_kinds() {
        assert_eq!(cosmetic("#%#//scriptlet('x')").kind(), CosmeticKind::Js);
        assert_eq!(cosmetic("example.org$$script").kind(), CosmeticKind::Html);
        assert!(tokenize("example.org##.ad", true, false).is_none());
    }

    #[test]
    fn network_offsets() {
        let line = "@@||example.org^$script,domain=a.com|~b.com";
        let parts = network(line);
        assert!(parts.allowlist);
        assert_eq!(parts.pattern.of(line), "||example.org^");
        assert_eq!(parts.modifiers.unwrap().of(line), "script,domain=a.com|~b.com");
        assert_eq!(parts.domains.unwrap().of(line), "a.com|~b.com");

        let line = "||ads.example.com^";
        let parts = network(line);
        assert_eq!(parts.pattern.of(line), "||ads.example.com^");
        assert!(parts.modifiers.is_none());
    }

    #[test]
    fn regex_pattern_keeps_inner_dollar() {
        let line = "/banner\\d+$/";
        assert_eq!(network(line).pattern.of(line), line);
    }

    #[test]
    fn host_lines() {
        let line = "0.0.0.0 ads.example.com tracker.example.com # comment";
        match tokenize(line, false, false) {
            Some(RuleParts::Host(parts)) => {
                assert_eq!(parts.ip.of(line), "0.0.0.0");
                assert_eq!(parts.hostnames.of(line), "ads.example.com tracker.example.com");
            }
            other => panic!("expected host parts, got {other:?}"),
        }
        assert!(matches!(tokenize(line, false, true), Some(RuleParts::Network(_))));
    }

    #[test]
    fn rejects_comments_and_short_lines() {
        assert!(tokenize("! comment", false, false).is_none());
        assert!(tokenize("# hosts comment", false, false).is_none());
        assert!(tokenize("ab", false, false).is_none());
        assert!(tokenize("   ", false, false).is_none());
        assert!(tokenize("example.org##", false, false).is_none());
    }
}
