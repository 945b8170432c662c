//! netsieve Rule Parser
//!
//! Parses adblock filter syntax into network, cosmetic and host rules.
//!
//! # Modules
//!
//! - `network`: `||example.org^$script`-style URL rules
//! - `cosmetic`: `##`, `#$#`, `#%#` and `$$` rules
//! - `host`: hosts-file lines
//! - `pattern`: URL pattern matching and shortcut extraction
//! - `domain`: `$domain=` lists
//! - `scriptlet`: `//scriptlet(...)` calls
//! - `marker` / `options`: offset helpers shared with the tokenizer

pub mod cosmetic;
pub mod domain;
pub mod error;
pub mod host;
pub mod marker;
pub mod network;
pub mod options;
pub mod pattern;
pub mod rule;
pub mod scriptlet;

pub use cosmetic::{CosmeticRule, PathPattern};
pub use domain::DomainModifier;
pub use error::RuleError;
pub use host::HostRule;
pub use marker::{find_marker, CosmeticKind, Marker};
pub use network::{NetworkRule, NetworkRuleOption};
pub use pattern::{extract_shortcut, Pattern};
pub use rule::{parse_rule, ParseOptions, Rule, MIN_RULE_LENGTH};
pub use scriptlet::ScriptletCall;
