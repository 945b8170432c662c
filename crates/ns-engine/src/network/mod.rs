//! Network rule lookup tables.
//!
//! Every network rule is owned by exactly one table, tried in this order:
//!
//! 1. [`HostnameLookupTable`]: `||host^` and `||host/path`
//! 2. [`TrieLookupTable`]: rules with a usable literal shortcut
//! 3. [`DomainLookupTable`]: rules restricted by `$domain=`
//! 4. [`SeqScanLookupTable`]: everything else

mod domain;
mod engine;
mod hostname;
mod seq_scan;
mod trie;

use std::sync::Arc;

use ns_core::{HashCache, PublicSuffixes, Request};
use ns_rules::NetworkRule;

use crate::storage::{RuleStorage, ScannedRule};

pub use domain::DomainLookupTable;
pub use engine::{NetworkEngine, BUILD_CHUNK_SIZE};
pub use hostname::HostnameLookupTable;
pub use seq_scan::SeqScanLookupTable;
pub use trie::{TrieLookupTable, MIN_SHORTCUT_LENGTH};

/// Shared state a table needs to index and match rules.
pub struct TableContext<'a> {
    pub storage: &'a mut RuleStorage,
    pub hashes: &'a mut HashCache,
    pub psl: &'a PublicSuffixes,
}

/// A strategy for indexing network rules.
pub trait LookupTable: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Take ownership of `rule` if this table can index it.
    fn add(&mut self, rule: &ScannedRule, ctx: &mut TableContext<'_>) -> bool;

    /// All owned rules that match `request`.
    fn match_all(&mut self, request: &Request, ctx: &mut TableContext<'_>) -> Vec<Arc<NetworkRule>>;

    /// Number of rules owned.
    fn count(&self) -> usize;
}
