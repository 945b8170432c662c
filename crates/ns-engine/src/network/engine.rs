use std::sync::Arc;

use ns_core::Request;
use ns_rules::NetworkRule;

use super::{
    DomainLookupTable, HostnameLookupTable, LookupTable, SeqScanLookupTable, TableContext,
    TrieLookupTable,
};
use crate::matching_result::MatchingResult;
use crate::rule_list::ScanMode;
use crate::storage::ScannedRule;
use crate::tokenizer::RuleParts;

/// Lines processed between scheduler yields in [`NetworkEngine::build_async`].
pub const BUILD_CHUNK_SIZE: usize = 5000;

/// Composes the network lookup tables.
pub struct NetworkEngine {
    tables: Vec<Box<dyn LookupTable>>,
}

impl Default for NetworkEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NetworkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkEngine")
            .field("tables", &self.table_counts())
            .finish()
    }
}

impl NetworkEngine {
    /// Empty engine with the tables in matching order.
    pub fn new() -> Self {
        Self {
            tables: vec![
                Box::new(HostnameLookupTable::new()),
                Box::new(TrieLookupTable::new()),
                Box::new(DomainLookupTable::new()),
                Box::new(SeqScanLookupTable::new()),
            ],
        }
    }

    /// Index every network rule in storage.
    pub fn build(ctx: &mut TableContext<'_>) -> Self {
        let mut engine = Self::new();
        let scanner = ctx.storage.create_scanner(ScanMode::NETWORK);
        for rule in scanner {
            engine.add_rule(&rule, ctx);
        }
        engine.log_summary();
        engine
    }

    /// Same as [`build`](Self::build), yielding to the runtime every
    /// [`BUILD_CHUNK_SIZE`] lines.
    pub async fn build_async(ctx: &mut TableContext<'_>) -> Self {
        let mut engine = Self::new();
        let scanner = ctx.storage.create_scanner(ScanMode::NETWORK);
        for (i, rule) in scanner.enumerate() {
            if i > 0 && i % BUILD_CHUNK_SIZE == 0 {
                tokio::task::yield_now().await;
            }
            engine.add_rule(&rule, ctx);
        }
        engine.log_summary();
        engine
    }

    fn log_summary(&self) {
        log::info!(
            "Network engine built with {} rules: {:?}",
            self.rules_count(),
            self.table_counts()
        );
    }

    /// Hand `rule` to the first table that accepts it.
    pub fn add_rule(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool {
        if !matches!(rule.parts(), RuleParts::Network(_)) {
            return false;
        }
        for table in &mut self.tables {
            if table.add(rule, ctx) {
                return true;
            }
        }
        log::debug!("No lookup table accepted rule {:?}", rule.line());
        false
    }

    /// Every rule matching `request`, in table order.
    pub fn match_all(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>> {
        let mut rules = Vec::new();
        for table in &mut self.tables {
            rules.extend(table.match_all(request, ctx));
        }
        rules
    }

    /// The rule deciding `request`, after conflict resolution.
    pub fn match_request(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Option<Arc<NetworkRule>> {
        let rules = self.match_all(request, ctx);
        MatchingResult::new(rules, None).basic_rule().cloned()
    }

    pub fn rules_count(&self) -> usize {
        self.tables.iter().map(|table| table.count()).sum()
    }

    /// Rule count per table, in matching order.
    pub fn table_counts(&self) -> Vec<(&'static str, usize)> {
        self.tables.iter().map(|table| (table.name(), table.count())).collect()
    }
}
