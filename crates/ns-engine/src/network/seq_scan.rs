use std::sync::Arc;

use ns_core::{Request, StorageIndex};
use ns_rules::NetworkRule;

use super::{LookupTable, TableContext};
use crate::storage::ScannedRule;

/// Fallback table: rules are materialized up front and scanned linearly.
#[derive(Debug, Default)]
pub struct SeqScanLookupTable {
    rules: Vec<(StorageIndex, Arc<NetworkRule>)>,
}

impl SeqScanLookupTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LookupTable for SeqScanLookupTable {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn add(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        match ctx.storage.retrieve_network_rule(rule.index) {
            Some(network) => {
                self.rules.push((rule.index, network));
                true
            }
            None => false,
        }
    }

    fn match_all(&mut self, request: &Request, _ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.matches(request))
            .map(|(_, rule)| Arc::clone(rule))
            .collect()
    }

    fn count(&self) -> usize {
        self.rules.len()
    }
}
