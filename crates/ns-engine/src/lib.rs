//! netsieve Engine
//!
//! Indexes filter lists and matches requests against them without parsing
//! every rule up front.
//!
//! # Modules
//!
//! - `tokenizer`: classify a rule line into offsets
//! - `rule_list` / `storage`: raw list text and lazily materialized rules
//! - `network`: hostname, trie, domain and sequential lookup tables
//! - `cosmetic`: per-kind cosmetic tables with allowlist resolution
//! - `matching_result`: conflict resolution over matched network rules
//! - `dns`: hostname-only matching with hosts-file rules
//! - `engine`: the façade with a result cache
//! - `config`: engine options and list configuration

pub mod config;
pub mod cosmetic;
pub mod dns;
pub mod engine;
pub mod matching_result;
pub mod network;
pub mod rule_list;
pub mod storage;
pub mod tokenizer;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, EngineOptions, FilterListConfig};
pub use cosmetic::{CosmeticEngine, CosmeticOption, CosmeticResult};
pub use dns::{DnsEngine, DnsResult};
pub use engine::{create_engine, Engine};
pub use matching_result::MatchingResult;
pub use network::{NetworkEngine, BUILD_CHUNK_SIZE};
pub use rule_list::{RuleList, ScanMode};
pub use storage::{RuleStorage, StorageError};
pub use tokenizer::{tokenize, RuleParts};

pub use ns_core::{PublicSuffixes, Request, RequestType};
