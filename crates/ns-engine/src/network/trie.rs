use std::collections::HashSet;
use std::sync::Arc;

use ns_core::{Request, StorageIndex};
use ns_rules::{extract_shortcut, NetworkRule};

use super::{LookupTable, TableContext};
use crate::storage::ScannedRule;
use crate::tokenizer::RuleParts;

/// Shortcuts shorter than this would match too many URLs.
pub const MIN_SHORTCUT_LENGTH: usize = 3;

/// Scheme prefixes present in nearly every URL.
const GENERIC_PREFIXES: &[&str] = &["http://", "https://", "ws://", "wss://"];

/// Whether `shortcut` only narrows the URL scheme.
pub(crate) fn is_too_generic(shortcut: &str) -> bool {
    let shortcut = shortcut.trim_start_matches('|');
    GENERIC_PREFIXES.iter().any(|prefix| prefix.starts_with(shortcut))
}

#[derive(Debug, Default)]
struct TrieNode {
    /// Sorted by byte
    children: Vec<(u8, u32)>,
    indices: Vec<StorageIndex>,
}

impl TrieNode {
    fn child(&self, byte: u8) -> Option<u32> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| self.children[pos].1)
    }
}

/// Byte prefix tree over rule shortcuts.
///
/// Nodes live in one arena; node 0 is the root.
#[derive(Debug)]
pub struct TrieLookupTable {
    nodes: Vec<TrieNode>,
    /// Indices whose rule failed to materialize
    tombstones: HashSet<StorageIndex>,
    count: usize,
}

impl Default for TrieLookupTable {
    fn default() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            tombstones: HashSet::new(),
            count: 0,
        }
    }
}

impl TrieLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: &[u8], index: StorageIndex) {
        let mut node = 0usize;
        for &byte in key {
            node = match self.nodes[node].child(byte) {
                Some(child) => child as usize,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    let children = &mut self.nodes[node].children;
                    let pos = children.partition_point(|&(b, _)| b < byte);
                    children.insert(pos, (byte, child as u32));
                    child
                }
            };
        }
        self.nodes[node].indices.push(index);
    }

    /// Indices of every shortcut occurring in `text`, deduplicated.
    fn lookup(&self, text: &[u8]) -> Vec<StorageIndex> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for start in 0..text.len() {
            let mut node = 0usize;
            for &byte in &text[start..] {
                node = match self.nodes[node].child(byte) {
                    Some(child) => child as usize,
                    None => break,
                };
                for &index in &self.nodes[node].indices {
                    if !self.tombstones.contains(&index) && seen.insert(index) {
                        found.push(index);
                    }
                }
            }
        }
        found
    }
}

impl LookupTable for TrieLookupTable {
    fn name(&self) -> &'static str {
        "trie"
    }

    fn add(&mut self, rule: &ScannedRule, _ctx: &mut TableContext<'_>) -> bool {
        let parts = match rule.parts() {
            RuleParts::Network(parts) => parts,
            _ => return false,
        };
        let shortcut = extract_shortcut(parts.pattern.of(rule.line()));
        if shortcut.len() < MIN_SHORTCUT_LENGTH || is_too_generic(&shortcut) {
            return false;
        }

        self.insert(shortcut.as_bytes(), rule.index);
        self.count += 1;
        true
    }

    fn match_all(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>> {
        let mut matched = Vec::new();
        for index in self.lookup(request.url_lowercase.as_bytes()) {
            match ctx.storage.retrieve_network_rule(index) {
                Some(rule) => {
                    if rule.matches(request) {
                        matched.push(rule);
                    }
                }
                None => {
                    if self.tombstones.insert(index) {
                        self.count -= 1;
                    }
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
    fn test_is_too_generic() {
        assert!(is_too_generic("http"));
        assert!(is_too_generic("|http"));
        assert!(is_too_generic("https://"));
        assert!(is_too_generic("ws:"));
        assert!(is_too_generic("|ws"));
        assert!(!is_too_generic("banner"));
        assert!(!is_too_generic("http://ads."));
    }

    #[test]
    fn lookup_finds_substrings() {
        let mut trie = TrieLookupTable::new();
        let a = StorageIndex::new(0, 1);
        let b = StorageIndex::new(0, 2);
        trie.insert(b"banner", a);
        trie.insert(b"ban", b);
        trie.insert(b"banner", b);

        let found = trie.lookup(b"https://x.com/banner.gif");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a) && found.contains(&b));
        assert!(trie.lookup(b"https://x.com/bat.gif").is_empty());

        trie.tombstones.insert(a);
        assert_eq!(trie.lookup(b"/banner"), vec![b]);
    }
}
