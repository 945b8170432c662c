//! Rule storage with lazy materialization.
//!
//! Lookup tables only keep [`StorageIndex`] values. A rule is parsed the
//! first time a table asks for it and cached for the lifetime of the
//! storage. Lines that fail to parse are remembered too, so they are never
//! parsed twice.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ns_core::{StorageIndex, MAX_LIST_ID};
use ns_rules::{parse_rule, CosmeticRule, HostRule, NetworkRule, Rule};

use crate::rule_list::{RuleList, RuleScanner, ScanMode, ScannedLine};
use crate::tokenizer::RuleParts;

/// Error type for storage construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Duplicate filter list id: {0}")]
    DuplicateListId(u32),

    #[error("Filter list id {0} is out of range (must be below {max})", max = MAX_LIST_ID)]
    ListIdOutOfRange(u32),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Position in the rule arena
    Parsed(usize),
    Invalid,
}

/// All filter lists of an engine plus the materialized-rule cache.
#[derive(Debug)]
pub struct RuleStorage {
    lists: BTreeMap<u32, RuleList>,
    rules: Vec<Rule>,
    slots: HashMap<StorageIndex, Slot>,
}

impl RuleStorage {
    pub fn new(lists: Vec<RuleList>) -> Result<Self, StorageError> {
        let mut by_id = BTreeMap::new();
        for list in lists {
            let id = list.id();
            if id >= MAX_LIST_ID {
                return Err(StorageError::ListIdOutOfRange(id));
            }
            if by_id.insert(id, list).is_some() {
                return Err(StorageError::DuplicateListId(id));
            }
        }
        Ok(Self {
            lists: by_id,
            rules: Vec::new(),
            slots: HashMap::new(),
        })
    }

    pub fn list(&self, id: u32) -> Option<&RuleList> {
        self.lists.get(&id)
    }

    /// Lists in ascending id order.
    pub fn lists(&self) -> impl Iterator<Item = &RuleList> {
        self.lists.values()
    }

    /// Number of rules materialized so far.
    pub fn materialized_count(&self) -> usize {
        self.rules.len()
    }

    /// Raw text of the rule at byte offset `rule_index` in list `list_id`.
    pub fn retrieve_rule_text(&self, list_id: u32, rule_index: usize) -> Option<&str> {
        self.lists.get(&list_id)?.rule_text(rule_index)
    }

    /// Scanner over every list, in ascending id order.
    pub fn create_scanner(&self, mode: ScanMode) -> StorageScanner {
        let scanners = self
            .lists
            .values()
            .map(|list| (list.id(), list.scanner(mode)))
            .collect();
        StorageScanner {
            scanners,
            current: 0,
        }
    }

    /// Materialize the rule at `index`.
    ///
    /// `ignore_host` parses hosts-file lines as network rules. The first
    /// retrieval of an index decides its cached form.
    pub fn retrieve_rule(&mut self, index: StorageIndex, ignore_host: bool) -> Option<Rule> {
        match self.slots.get(&index) {
            Some(Slot::Parsed(pos)) => return self.rules.get(*pos).cloned(),
            Some(Slot::Invalid) => return None,
            None => {}
        }

        let rule = self.materialize(index, ignore_host);
        let slot = match &rule {
            Some(rule) => {
                self.rules.push(rule.clone());
                Slot::Parsed(self.rules.len() - 1)
            }
            None => Slot::Invalid,
        };
        self.slots.insert(index, slot);
        rule
    }

    fn materialize(&self, index: StorageIndex, ignore_host: bool) -> Option<Rule> {
        let list = self.lists.get(&index.list_id())?;
        let text = list.rule_text(index.rule_index())?;

        let rule = match parse_rule(text, list.id(), Some(index), list.parse_options(ignore_host)) {
            Ok(Some(rule)) => rule,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Failed to parse rule {:?} from list {}: {}", text, list.id(), e);
                return None;
            }
        };

        if list.is_ignoring_unsafe() {
            if let Rule::Network(network) = &rule {
                if network.is_unsafe() {
                    log::debug!("Skipping unsafe rule {:?} from list {}", text, list.id());
                    return None;
                }
            }
        }
        Some(rule)
    }

    pub fn retrieve_network_rule(&mut self, index: StorageIndex) -> Option<Arc<NetworkRule>> {
        self.retrieve_rule(index, true)?.as_network().cloned()
    }

    pub fn retrieve_cosmetic_rule(&mut self, index: StorageIndex) -> Option<Arc<CosmeticRule>> {
        self.retrieve_rule(index, true)?.as_cosmetic().cloned()
    }

    pub fn retrieve_host_rule(&mut self, index: StorageIndex) -> Option<Arc<HostRule>> {
        self.retrieve_rule(index, false)?.as_host().cloned()
    }
}

/// A scanned line plus its storage index.
#[derive(Debug, Clone)]
pub struct ScannedRule {
    line: ScannedLine,
    pub index: StorageIndex,
}

impl ScannedRule {
    pub fn line(&self) -> &str {
        self.line.line()
    }

    pub fn parts(&self) -> &RuleParts {
        &self.line.parts
    }

    pub fn list_id(&self) -> u32 {
        self.index.list_id()
    }
}

/// Fans out over the per-list scanners.
#[derive(Debug)]
pub struct StorageScanner {
    scanners: Vec<(u32, RuleScanner)>,
    current: usize,
}

impl Iterator for StorageScanner {
    type Item = ScannedRule;

    fn next(&mut self) -> Option<ScannedRule> {
        while let Some((list_id, scanner)) = self.scanners.get_mut(self.current) {
            if let Some(line) = scanner.next() {
                let index = StorageIndex::new(*list_id, line.offset());
                return Some(ScannedRule { line, index });
            }
            self.current += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> RuleStorage {
        RuleStorage::new(vec![
            RuleList::new(2, "||second.com^\n"),
            RuleList::new(1, "||first.com^\nexample.org##.ad\n||bad.com^$bogus\n"),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_and_out_of_range_ids() {
        let err = RuleStorage::new(vec![RuleList::new(1, ""), RuleList::new(1, "")]).unwrap_err();
        assert_eq!(err, StorageError::DuplicateListId(1));

        let err = RuleStorage::new(vec![RuleList::new(MAX_LIST_ID, "")]).unwrap_err();
        assert_eq!(err, StorageError::ListIdOutOfRange(MAX_LIST_ID));
    }

    #[test]
    fn scanner_visits_lists_in_id_order() {
        let storage = storage();
        let lines: Vec<_> = storage
            .create_scanner(ScanMode::NETWORK)
            .map(|r| (r.list_id(), r.line().to_string()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (1, "||first.com^".to_string()),
                (1, "||bad.com^$bogus".to_string()),
                (2, "||second.com^".to_string()),
            ]
        );
    }

    #[test]
    fn indices_round_trip_to_text() {
        let storage = storage();
        for scanned in storage.create_scanner(ScanMode::ALL) {
            let text = storage.retrieve_rule_text(scanned.index.list_id(), scanned.index.rule_index());
            assert_eq!(text, Some(scanned.line()));
        }
        assert_eq!(storage.retrieve_rule_text(9, 0), None);
    }

    #[test]
    fn materializes_once_and_type_checks() {
        let mut storage = storage();
        let scanned: Vec<_> = storage.create_scanner(ScanMode::ALL).collect();

        let first = storage.retrieve_network_rule(scanned[0].index).unwrap();
        let again = storage.retrieve_network_rule(scanned[0].index).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.index(), Some(scanned[0].index));
        assert_eq!(storage.materialized_count(), 1);

        assert!(storage.retrieve_cosmetic_rule(scanned[0].index).is_none());
        assert!(storage.retrieve_cosmetic_rule(scanned[1].index).is_some());
        assert!(storage.retrieve_network_rule(scanned[2].index).is_none());
        assert!(storage.retrieve_network_rule(scanned[2].index).is_none());
        assert_eq!(storage.materialized_count(), 2);
    }

    #[test]
    fn ignores_unsafe_rules_when_configured() {
        let text = "||example.com^$csp=script-src 'none'\n";
        let mut storage = RuleStorage::new(vec![RuleList::new(0, text).ignore_unsafe(true)]).unwrap();
        let index = storage.create_scanner(ScanMode::NETWORK).next().unwrap().index;
        assert!(storage.retrieve_network_rule(index).is_none());

        let mut storage = RuleStorage::new(vec![RuleList::new(0, text)]).unwrap();
        assert!(storage.retrieve_network_rule(index).is_some());
    }

    #[test]
    fn retrieves_host_rules() {
        let mut storage = RuleStorage::new(vec![RuleList::new(0, "127.0.0.1 ads.example.com\n")]).unwrap();
        let index = storage.create_scanner(ScanMode::HOST).next().unwrap().index;
        let rule = storage.retrieve_host_rule(index).unwrap();
        assert!(rule.matches("ads.example.com"));
    }
}
