//! Bounded memo of hostname hashes.
//!
//! Every lookup table hashes the same handful of subdomains per request,
//! so the engine keeps a small LRU of recent results. The cache is owned
//! by whoever assembles an engine and passed down by `&mut`.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::hash::fast_hash;

/// Default number of memoized hashes.
pub const DEFAULT_HASH_CACHE_SIZE: usize = 1000;

pub struct HashCache {
    entries: LruCache<String, u32>,
}

impl HashCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Hash `value`, reusing a memoized result when present.
    pub fn hash(&mut self, value: &str) -> u32 {
        if let Some(&hash) = self.entries.get(value) {
            return hash;
        }
        let hash = fast_hash(value);
        self.entries.put(value.to_string(), hash);
        hash
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for HashCache {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_CACHE_SIZE)
    }
}
