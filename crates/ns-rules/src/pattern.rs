//! Network rule URL patterns.
//!
//! A pattern is one of:
//!
//! - a plain substring (`/banner/ads.`)
//! - a bare hostname anchor (`||ads.example.com^`), matched on the request
//!   hostname without touching a regex
//! - an ABP wildcard pattern compiled to a regex (`||example.com/*.js|`)
//! - a literal regex (`/banner\d+\.gif/`)
//!
//! Regexes are compiled on first use. An invalid regex never matches.

use std::sync::OnceLock;

use ns_core::Request;
use regex::Regex;

use crate::error::RuleError;

/// Regex fragment for `^`: any separator character or the end of the URL.
const SEPARATOR_CLASS: &str = r"(?:[^\w\-.%]|$)";

/// Regex fragment for `||`: scheme plus any number of subdomains.
const HOST_ANCHOR: &str = r"^(?:[^:/?#]+:)?(?://)?(?:[^/?#]*\.)?";

#[derive(Debug, Clone)]
enum PatternKind {
    /// Matches every URL
    Any,
    /// Substring; lowercased unless `$match-case`
    Plain(String),
    /// `||host^`
    Hostname(String),
    /// Regex source, compiled lazily
    Regex(String),
}

/// Compiled form of a network rule pattern.
#[derive(Debug)]
pub struct Pattern {
    text: String,
    match_case: bool,
    kind: PatternKind,
    regex: OnceLock<Option<Regex>>,
}

impl Clone for Pattern {
    fn clone(&self) -> Self {
        Self {
            text: self.text.clone(),
            match_case: self.match_case,
            kind: self.kind.clone(),
            regex: OnceLock::new(),
        }
    }
}

impl Pattern {
    /// Parse the pattern part of a network rule (no `@@`, no options).
    pub fn parse(text: &str, match_case: bool) -> Result<Self, RuleError> {
        let text = text.trim();
        let kind = classify(text, match_case)?;
        Ok(Self {
            text: text.to_string(),
            match_case,
            kind,
            regex: OnceLock::new(),
        })
    }

    /// Pattern as written.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this pattern matches every URL.
    pub fn is_any(&self) -> bool {
        matches!(self.kind, PatternKind::Any)
    }

    pub fn is_regex_literal(&self) -> bool {
        is_regex_literal(&self.text)
    }

    /// Host of a `||host^` pattern.
    pub fn hostname(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Hostname(host) => Some(host),
            _ => None,
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        match &self.kind {
            PatternKind::Any => true,
            PatternKind::Plain(needle) => {
                if self.match_case {
                    request.url.contains(needle.as_str())
                } else {
                    request.url_lowercase.contains(needle.as_str())
                }
            }
            PatternKind::Hostname(host) => hostname_matches(&request.hostname, host),
            PatternKind::Regex(source) => match self.compiled(source) {
                Some(re) => re.is_match(&request.url),
                None => false,
            },
        }
    }

    fn compiled(&self, source: &str) -> Option<&Regex> {
        self.regex
            .get_or_init(|| match Regex::new(source) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::debug!("Invalid regex in pattern {:?}: {}", self.text, e);
                    None
                }
            })
            .as_ref()
    }
}

/// `hostname` equals `host` or is a subdomain of it.
pub fn hostname_matches(hostname: &str, host: &str) -> bool {
    if hostname == host {
        return true;
    }
    hostname.len() > host.len()
        && hostname.ends_with(host)
        && hostname.as_bytes()[hostname.len() - host.len() - 1] == b'.'
}

/// `/…/` literal regex syntax.
pub fn is_regex_literal(text: &str) -> bool {
    text.len() > 2 && text.starts_with('/') && text.ends_with('/')
}

fn is_hostname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_'
}

fn classify(text: &str, match_case: bool) -> Result<PatternKind, RuleError> {
    if is_regex_literal(text) {
        let source = &text[1..text.len() - 1];
        let source = if match_case {
            source.to_string()
        } else {
            format!("(?i){source}")
        };
        return Ok(PatternKind::Regex(source));
    }

    if text == "||" || text == "|" || text == "||*" {
        return Err(RuleError::EmptyPattern);
    }

    let trimmed = text.trim_matches('*');
    if trimmed.is_empty() {
        return Ok(PatternKind::Any);
    }

    // ||host^
    if let Some(host) = text.strip_prefix("||").and_then(|t| t.strip_suffix('^')) {
        if !host.is_empty() && host.chars().all(is_hostname_char) {
            return Ok(PatternKind::Hostname(host.to_ascii_lowercase()));
        }
    }

    let anchored = text.starts_with('|') || (text.ends_with('|') && text.len() > 1);
    if !anchored && !trimmed.contains(['*', '^']) {
        let needle = if match_case {
            trimmed.to_string()
        } else {
            trimmed.to_ascii_lowercase()
        };
        return Ok(PatternKind::Plain(needle));
    }

    Ok(PatternKind::Regex(wildcard_to_regex(text, match_case)))
}

/// Convert ABP wildcard syntax (`||`, `|`, `*`, `^`) to a regex source.
pub fn wildcard_to_regex(text: &str, match_case: bool) -> String {
    let mut body = text;
    let mut prefix = "";
    let mut suffix = "";

    if let Some(rest) = body.strip_prefix("||") {
        prefix = HOST_ANCHOR;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('|') {
        prefix = "^";
        body = rest;
    }
    if let Some(rest) = body.strip_suffix('|') {
        suffix = "$";
        body = rest;
    }

    let mut source = String::with_capacity(body.len() * 2 + 16);
    if !match_case {
        source.push_str("(?i)");
    }
    source.push_str(prefix);

    let mut buf = [0u8; 4];
    for c in body.chars() {
        match c {
            '*' => source.push_str(".*"),
            '^' => source.push_str(SEPARATOR_CLASS),
            _ => source.push_str(&regex::escape(c.encode_utf8(&mut buf))),
        }
    }

    source.push_str(suffix);
    source
}

// =============================================================================
// Shortcut Extraction
// =============================================================================

/// Longest literal that must occur (case-insensitively) in every URL the
/// pattern matches. Empty when none can be derived.
pub fn extract_shortcut(pattern: &str) -> String {
    let pattern = pattern.trim();
    if is_regex_literal(pattern) {
        return regex_shortcut(&pattern[1..pattern.len() - 1]);
    }

    let mut body = pattern;
    if let Some(rest) = body.strip_prefix("||") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix('|') {
        body = rest;
    }
    if body.len() > 1 {
        body = body.strip_suffix('|').unwrap_or(body);
    }

    body.split(['*', '^'])
        .max_by_key(|part| part.len())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn regex_shortcut(source: &str) -> String {
    // Alternation makes every literal optional
    if source.contains('|') {
        return String::new();
    }

    let chars: Vec<char> = source.chars().collect();
    let mut best = String::new();
    let mut current = String::new();
    let mut i = 0;

    let flush = |current: &mut String, best: &mut String| {
        if current.len() > best.len() {
            *best = current.clone();
        }
        current.clear();
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                match chars.get(i + 1) {
                    Some(&next) if next.is_ascii_punctuation() => {
                        current.push(next);
                        i += 2;
                    }
                    _ => {
                        flush(&mut current, &mut best);
                        i = skip_escape(&chars, i + 1);
                    }
                }
                continue;
            }
            '[' => {
                flush(&mut current, &mut best);
                i = skip_class(&chars, i);
                continue;
            }
            '(' => {
                flush(&mut current, &mut best);
                i = skip_group(&chars, i);
                continue;
            }
            '?' | '*' | '{' => {
                current.pop();
                flush(&mut current, &mut best);
                if c == '{' {
                    while i < chars.len() && chars[i] != '}' {
                        i += 1;
                    }
                }
            }
            '.' | '+' | ')' | '^' | '$' | ']' | '}' => flush(&mut current, &mut best),
            _ => current.push(c),
        }
        i += 1;
    }
    flush(&mut current, &mut best);

    best.to_lowercase()
}

/// Index just past the escape whose letter sits at `at`, arguments included.
fn skip_escape(chars: &[char], at: usize) -> usize {
    let braced = |from: usize| match chars.get(from).copied() {
        Some('{') => chars[from..]
            .iter()
            .position(|&c| c == '}')
            .map_or(chars.len(), |end| from + end + 1),
        _ => from,
    };
    let digits = |from: usize, max: usize, radix: u32| {
        let count = chars[from.min(chars.len())..]
            .iter()
            .take(max)
            .take_while(|c| c.is_digit(radix))
            .count();
        from + count
    };

    match chars.get(at).copied() {
        None => chars.len(),
        Some('x') | Some('u') | Some('U') => {
            let width = match chars[at] {
                'x' => 2,
                'u' => 4,
                _ => 8,
            };
            match braced(at + 1) {
                end if end > at + 1 => end,
                _ => digits(at + 1, width, 16),
            }
        }
        Some('p') | Some('P') => match braced(at + 1) {
            end if end > at + 1 => end,
            _ => (at + 2).min(chars.len()),
        },
        Some('c') => (at + 2).min(chars.len()),
        Some(c) if c.is_digit(8) => digits(at, 3, 8),
        Some(_) => at + 1,
    }
}

/// Index just past the `]` closing the class opened at `start`.
fn skip_class(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ']' => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Index just past the group opened at `start`, plus any quantifier.
fn skip_group(chars: &[char], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 2;
                continue;
            }
            '[' => {
                i = skip_class(chars, i);
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::{PublicSuffixes, RequestType};

    fn request(url: &str) -> Request {
        Request::new(url, None, RequestType::OTHER, &PublicSuffixes::default())
    }

    #[test]
    fn plain_pattern() {
        let pattern = Pattern::parse("/Banner/ads.", false).unwrap();
        assert!(!pattern.is_regex_literal());
        assert!(pattern.matches(&request("https://example.com/banner/ads.gif")));
        assert!(!pattern.matches(&request("https://example.com/other/ads.gif")));
    }

    #[test]
    fn match_case_plain_pattern() {
        let pattern = Pattern::parse("/Banner/ads.", true).unwrap();
        assert!(pattern.matches(&request("https://example.com/Banner/ads.gif")));
        assert!(!pattern.matches(&request("https://example.com/banner/ads.gif")));
    }

    #[test]
    fn hostname_pattern() {
        let pattern = Pattern::parse("||ads.example.com^", false).unwrap();
        assert_eq!(pattern.hostname(), Some("ads.example.com"));
        assert!(pattern.matches(&request("https://ads.example.com/x")));
        assert!(pattern.matches(&request("https://cdn.ads.example.com:8080/x")));
        assert!(!pattern.matches(&request("https://badads.example.com/x")));
        assert!(!pattern.matches(&request("https://example.com/ads.example.com")));
    }

    #[test]
    fn wildcard_pattern() {
        let pattern = Pattern::parse("||example.com/*.js|", false).unwrap();
        assert!(pattern.matches(&request("https://www.example.com/static/app.js")));
        assert!(!pattern.matches(&request("https://www.example.com/static/app.js?v=1")));
        assert!(!pattern.matches(&request("https://notexample.com/app.js")));
    }

    #[test]
    fn separator_pattern() {
        let pattern = Pattern::parse("/ads^", false).unwrap();
        assert!(pattern.matches(&request("https://example.com/ads?x=1")));
        assert!(pattern.matches(&request("https://example.com/ads")));
        assert!(!pattern.matches(&request("https://example.com/adsense")));
    }

    #[test]
    fn left_anchor_pattern() {
        let pattern = Pattern::parse("|https://tracker.", false).unwrap();
        assert!(pattern.matches(&request("https://tracker.example.com/")));
        assert!(!pattern.matches(&request("http://x.com/?u=https://tracker.y")));
    }

    #[test]
    fn regex_pattern() {
        let pattern = Pattern::parse(r"/banner\d+\.gif/", false).unwrap();
        assert!(pattern.matches(&request("https://example.com/BANNER42.gif")));
        assert!(!pattern.matches(&request("https://example.com/banner.gif")));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let pattern = Pattern::parse("/ban(ner/", false).unwrap();
        assert!(!pattern.matches(&request("https://example.com/ban(ner")));
    }

    #[test]
    fn wildcard_only_patterns() {
        assert!(Pattern::parse("*", false).unwrap().is_any());
        assert!(Pattern::parse("", false).unwrap().is_any());
        assert!(Pattern::parse("||", false).is_err());
    }

    #[test]
    fn test_extract_shortcut() {
        assert_eq!(extract_shortcut("||example.com^"), "example.com");
        assert_eq!(extract_shortcut("/ads/*/banner_big"), "/banner_big");
        assert_eq!(extract_shortcut("|http://"), "http://");
        assert_eq!(extract_shortcut("*"), "");
        assert_eq!(extract_shortcut("/Tracker.JS"), "/tracker.js");
    }

    #[test]
    fn test_regex_shortcut() {
        assert_eq!(extract_shortcut(r"/banner\d+\.gif/"), "banner");
        assert_eq!(extract_shortcut(r"/^https?:\/\/ads\.example\.com\//"), "://ads.example.com/");
        assert_eq!(extract_shortcut("/(foo|bar)baz/"), "");
        assert_eq!(extract_shortcut("/(optional)?required/"), "required");
        assert_eq!(extract_shortcut("/[abc]defg/"), "defg");
        assert_eq!(extract_shortcut("/colou?r-scheme/"), "r-scheme");
    }

    #[test]
    fn regex_shortcut_skips_escape_arguments() {
        assert_eq!(extract_shortcut(r"/ban\x6eer/"), "ban");
        assert_eq!(extract_shortcut(r"/trackers\x{2f}pixel/"), "trackers");
        assert_eq!(extract_shortcut(r"/ads\u002fbanner/"), "banner");
        assert_eq!(extract_shortcut(r"/promo\u{2F}x/"), "promo");
        assert_eq!(extract_shortcut(r"/tracker\0123/"), "tracker");
        assert_eq!(extract_shortcut(r"/\p{Greek}widget/"), "widget");
        assert_eq!(extract_shortcut(r"/\pLbanner/"), "banner");

        for (text, url) in [
            (r"/ban\x6eer/", "https://x.com/banner.js"),
            (r"/ads\u002fbanner/", "https://x.com/ads/banner.js"),
        ] {
            let pattern = Pattern::parse(text, false).unwrap();
            let request = request(url);
            assert!(pattern.matches(&request), "{text} should match {url}");
            assert!(request.url_lowercase.contains(&extract_shortcut(text)));
        }
    }

    #[test]
    fn shortcut_is_substring_of_matches() {
        let cases = [
            ("||ads.example.com^", "https://ads.example.com/x"),
            ("/Banner/*/img", "https://cdn.org/banner/1/img.png"),
            (r"/track\d+\.php/", "https://t.org/TRACK9.php"),
        ];
        for (text, url) in cases {
            let pattern = Pattern::parse(text, false).unwrap();
            let request = request(url);
            assert!(pattern.matches(&request), "{text} should match {url}");
            assert!(request.url_lowercase.contains(&extract_shortcut(text)));
        }
    }
}
