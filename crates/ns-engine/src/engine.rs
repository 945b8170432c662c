//! Engine façade: storage, network and cosmetic matching behind one type.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use ns_core::{HashCache, PublicSuffixes, Request, RequestType, StorageIndex};
use ns_rules::NetworkRule;

use crate::config::{ConfigError, EngineConfig, EngineOptions};
use crate::cosmetic::{CosmeticEngine, CosmeticOption, CosmeticResult};
use crate::matching_result::{remove_badfilter_rules, MatchingResult};
use crate::network::{NetworkEngine, TableContext};
use crate::rule_list::RuleList;
use crate::storage::{RuleStorage, StorageError};

/// Build an engine over `lists` with the heuristic public suffix rules.
pub fn create_engine(lists: Vec<RuleList>, options: EngineOptions) -> Result<Engine, StorageError> {
    Ok(Engine::new(RuleStorage::new(lists)?, options))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultCacheKey {
    url: String,
    source_hostname: Option<String>,
    request_type: u32,
    method: Option<u16>,
    frame_rule: Option<StorageIndex>,
}

/// Network and cosmetic matching over a set of filter lists.
pub struct Engine {
    storage: RuleStorage,
    hashes: HashCache,
    psl: PublicSuffixes,
    network: NetworkEngine,
    cosmetic: CosmeticEngine,
    result_cache: LruCache<ResultCacheKey, Arc<MatchingResult>>,
}

impl Engine {
    pub fn new(storage: RuleStorage, options: EngineOptions) -> Self {
        Self::with_public_suffixes(storage, options, PublicSuffixes::default())
    }

    pub fn with_public_suffixes(mut storage: RuleStorage, options: EngineOptions, psl: PublicSuffixes) -> Self {
        let mut hashes = HashCache::new(options.hash_cache_size);
        let mut ctx = TableContext {
            storage: &mut storage,
            hashes: &mut hashes,
            psl: &psl,
        };
        let network = NetworkEngine::build(&mut ctx);
        let cosmetic = CosmeticEngine::build(&mut ctx);
        Self::assemble(storage, hashes, psl, network, cosmetic, options)
    }

    /// Same as [`with_public_suffixes`](Self::with_public_suffixes) but
    /// yields to the runtime while indexing network rules.
    pub async fn build_async(mut storage: RuleStorage, options: EngineOptions, psl: PublicSuffixes) -> Self {
        let mut hashes = HashCache::new(options.hash_cache_size);
        let mut ctx = TableContext {
            storage: &mut storage,
            hashes: &mut hashes,
            psl: &psl,
        };
        let network = NetworkEngine::build_async(&mut ctx).await;
        let cosmetic = CosmeticEngine::build(&mut ctx);
        Self::assemble(storage, hashes, psl, network, cosmetic, options)
    }

    /// Load every list and the public suffix file named in `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let storage = RuleStorage::new(config.load_lists()?)?;
        let psl = config.load_public_suffixes()?;
        Ok(Self::with_public_suffixes(storage, config.options, psl))
    }

    fn assemble(
        storage: RuleStorage,
        hashes: HashCache,
        psl: PublicSuffixes,
        network: NetworkEngine,
        cosmetic: CosmeticEngine,
        options: EngineOptions,
    ) -> Self {
        let capacity = NonZeroUsize::new(options.result_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            storage,
            hashes,
            psl,
            network,
            cosmetic,
            result_cache: LruCache::new(capacity),
        }
    }

    fn ctx(&mut self) -> (&mut NetworkEngine, &mut CosmeticEngine, TableContext<'_>) {
        (
            &mut self.network,
            &mut self.cosmetic,
            TableContext {
                storage: &mut self.storage,
                hashes: &mut self.hashes,
                psl: &self.psl,
            },
        )
    }

    /// Build a [`Request`] using this engine's public suffix rules.
    pub fn request(&self, url: &str, source_url: Option<&str>, request_type: RequestType) -> Request {
        Request::new(url, source_url, request_type, &self.psl)
    }

    /// Match a network request.
    ///
    /// `frame_rule` is the document-level allowlist rule of the enclosing
    /// frame, usually from [`match_frame`](Self::match_frame). A frame rule
    /// without a storage index did not come from this engine and bypasses
    /// the result cache.
    pub fn match_request(&mut self, request: &Request, frame_rule: Option<&Arc<NetworkRule>>) -> Arc<MatchingResult> {
        let cacheable = frame_rule.map_or(true, |rule| rule.index().is_some());
        let key = ResultCacheKey {
            url: request.url.clone(),
            source_hostname: request.source_hostname.clone(),
            request_type: request.request_type.bits(),
            method: request.method.map(|m| m.bits()),
            frame_rule: frame_rule.and_then(|rule| rule.index()),
        };

        if cacheable {
            if let Some(result) = self.result_cache.get(&key) {
                log::trace!("Result cache hit for {}", request.url);
                return Arc::clone(result);
            }
        }

        let (network, _, mut ctx) = self.ctx();
        let rules = network.match_all(request, &mut ctx);
        let result = Arc::new(MatchingResult::new(rules, frame_rule.cloned()));

        if cacheable {
            self.result_cache.put(key, Arc::clone(&result));
        }
        result
    }

    /// Best document-level allowlist rule for a frame loaded from `url`.
    pub fn match_frame(&mut self, url: &str) -> Option<Arc<NetworkRule>> {
        let request = self.request(url, None, RequestType::DOCUMENT);
        let (network, _, mut ctx) = self.ctx();
        let rules = remove_badfilter_rules(network.match_all(&request, &mut ctx));
        rules
            .into_iter()
            .filter(|rule| rule.is_document_allowlist())
            .max_by_key(|rule| rule.priority())
    }

    /// Cosmetic rules for the page described by `request`.
    pub fn get_cosmetic_result(&mut self, request: &Request, option: CosmeticOption) -> CosmeticResult {
        let (_, cosmetic, mut ctx) = self.ctx();
        cosmetic.match_request(request, option, &mut ctx)
    }

    /// Cosmetic rules for a top-level page, honoring `$document`,
    /// `$elemhide` and related allowlist rules that match the page URL.
    pub fn get_page_cosmetic_result(&mut self, url: &str) -> CosmeticResult {
        let request = self.request(url, None, RequestType::DOCUMENT);
        let frame_rule = self.match_frame(url);
        let option = self.match_request(&request, frame_rule.as_ref()).cosmetic_option();
        self.get_cosmetic_result(&request, option)
    }

    pub fn retrieve_rule_text(&self, list_id: u32, rule_index: usize) -> Option<&str> {
        self.storage.retrieve_rule_text(list_id, rule_index)
    }

    /// Network plus cosmetic rules currently indexed.
    pub fn rules_count(&self) -> usize {
        self.network.rules_count() + self.cosmetic.rules_count()
    }

    pub fn network_rules_count(&self) -> usize {
        self.network.rules_count()
    }

    pub fn cosmetic_rules_count(&self) -> usize {
        self.cosmetic.rules_count()
    }

    pub fn public_suffixes(&self) -> &PublicSuffixes {
        &self.psl
    }

    pub fn storage(&self) -> &RuleStorage {
        &self.storage
    }

    pub fn clear_cache(&mut self) {
        self.result_cache.clear();
    }
}
