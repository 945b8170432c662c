use std::sync::Arc;

use ns_core::StorageIndex;

use crate::cosmetic::CosmeticRule;
use crate::error::RuleError;
use crate::host::{is_host_line, HostRule};
use crate::marker::{find_marker, CosmeticKind};
use crate::network::NetworkRule;

/// Rules shorter than this are ignored.
pub const MIN_RULE_LENGTH: usize = 3;

/// A fully parsed rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Network(Arc<NetworkRule>),
    Cosmetic(Arc<CosmeticRule>),
    Host(Arc<HostRule>),
}

impl Rule {
    pub fn text(&self) -> &str {
        match self {
            Rule::Network(rule) => rule.text(),
            Rule::Cosmetic(rule) => rule.text(),
            Rule::Host(rule) => rule.text(),
        }
    }

    pub fn list_id(&self) -> u32 {
        match self {
            Rule::Network(rule) => rule.list_id(),
            Rule::Cosmetic(rule) => rule.list_id(),
            Rule::Host(rule) => rule.list_id(),
        }
    }

    pub fn index(&self) -> Option<StorageIndex> {
        match self {
            Rule::Network(rule) => rule.index(),
            Rule::Cosmetic(rule) => rule.index(),
            Rule::Host(rule) => rule.index(),
        }
    }

    pub fn as_network(&self) -> Option<&Arc<NetworkRule>> {
        match self {
            Rule::Network(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_cosmetic(&self) -> Option<&Arc<CosmeticRule>> {
        match self {
            Rule::Cosmetic(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_host(&self) -> Option<&Arc<HostRule>> {
        match self {
            Rule::Host(rule) => Some(rule),
            _ => None,
        }
    }
}

/// Per-list parsing switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub ignore_cosmetic: bool,
    /// Skip `#%#` rules
    pub ignore_js: bool,
    /// Parse hosts-file lines as network rules instead
    pub ignore_host: bool,
}

/// Whether `line` carries no rule at all.
pub fn is_comment(line: &str) -> bool {
    line.starts_with('!') || (line.starts_with('#') && find_marker(line).is_none())
}

/// Parse one rule line.
///
/// Returns `Ok(None)` for comments, blank lines and rules excluded by
/// `options`.
pub fn parse_rule(
    text: &str,
    list_id: u32,
    index: Option<StorageIndex>,
    options: ParseOptions,
) -> Result<Option<Rule>, RuleError> {
    let text = text.trim();
    if text.is_empty() || is_comment(text) {
        return Ok(None);
    }
    if text.len() < MIN_RULE_LENGTH {
        return Err(RuleError::TooShort);
    }

    if let Some(marker) = find_marker(text) {
        if options.ignore_cosmetic || (options.ignore_js && marker.kind == CosmeticKind::Js) {
            return Ok(None);
        }
        let rule = CosmeticRule::parse(text, list_id)?.with_index(index);
        return Ok(Some(Rule::Cosmetic(Arc::new(rule))));
    }

    if !options.ignore_host && is_host_line(text) {
        let rule = HostRule::parse(text, list_id)?.with_index(index);
        return Ok(Some(Rule::Host(Arc::new(rule))));
    }

    let rule = NetworkRule::parse(text, list_id)?.with_index(index);
    Ok(Some(Rule::Network(Arc::new(rule))))
}
