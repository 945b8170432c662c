//! Engine and filter list configuration.
//!
//! The CLI reads an [`EngineConfig`] from JSON:
//!
//! ```json
//! {
//!   "lists": [{ "id": 1, "path": "easylist.txt", "ignore_unsafe": true }],
//!   "options": { "result_cache_size": 500 },
//!   "public_suffix_list": "public_suffix_list.dat"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ns_core::hash_cache::DEFAULT_HASH_CACHE_SIZE;
use ns_core::{PslError, PublicSuffixes};
use serde::Deserialize;

use crate::rule_list::RuleList;
use crate::storage::StorageError;

/// Default capacity of the engine's matching result cache.
pub const DEFAULT_RESULT_CACHE_SIZE: usize = 500;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Psl(#[from] PslError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Cache sizes for an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub result_cache_size: usize,
    pub hash_cache_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            result_cache_size: DEFAULT_RESULT_CACHE_SIZE,
            hash_cache_size: DEFAULT_HASH_CACHE_SIZE,
        }
    }
}

/// One filter list on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterListConfig {
    pub id: u32,
    pub path: PathBuf,
    #[serde(default)]
    pub ignore_cosmetic: bool,
    #[serde(default)]
    pub ignore_js: bool,
    #[serde(default)]
    pub ignore_unsafe: bool,
}

impl FilterListConfig {
    /// Read the list text. Relative paths resolve against `base`.
    pub fn load(&self, base: Option<&Path>) -> Result<RuleList, ConfigError> {
        let path = match base {
            Some(base) if self.path.is_relative() => base.join(&self.path),
            _ => self.path.clone(),
        };
        let text = read_file(&path)?;
        log::debug!("Loaded filter list {} from {}", self.id, path.display());
        Ok(RuleList::new(self.id, text)
            .ignore_cosmetic(self.ignore_cosmetic)
            .ignore_js(self.ignore_js)
            .ignore_unsafe(self.ignore_unsafe))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub lists: Vec<FilterListConfig>,
    #[serde(default)]
    pub options: EngineOptions,
    /// Public Suffix List file; a heuristic is used without it
    #[serde(default)]
    pub public_suffix_list: Option<PathBuf>,
    /// Directory that relative paths resolve against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON config; relative paths inside it resolve against the
    /// config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_json(&read_file(path)?)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn load_lists(&self) -> Result<Vec<RuleList>, ConfigError> {
        self.lists
            .iter()
            .map(|list| list.load(self.base_dir.as_deref()))
            .collect()
    }

    pub fn load_public_suffixes(&self) -> Result<PublicSuffixes, ConfigError> {
        let path = match &self.public_suffix_list {
            Some(path) => path,
            None => return Ok(PublicSuffixes::heuristic()),
        };
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        };
        Ok(PublicSuffixes::from_list(&read_file(&path)?)?)
    }
}
