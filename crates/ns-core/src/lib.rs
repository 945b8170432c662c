//! netsieve Core Library
//!
//! Shared primitives for the netsieve rule engine: hashing, public suffix
//! decomposition, URL helpers and the normalized [`Request`].
//!
//! # Modules
//!
//! - `hash`: Murmur3 hash used to key every lookup table
//! - `hash_cache`: bounded LRU memo of hostname hashes
//! - `psl`: Public Suffix List for eTLD+1 extraction
//! - `url`: Fast URL helpers without allocations
//! - `request`: Normalized request context
//! - `types`: Shared bit masks

pub mod hash;
pub mod hash_cache;
pub mod psl;
pub mod request;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use hash::fast_hash;
pub use hash_cache::HashCache;
pub use psl::{PslError, PublicSuffixes};
pub use request::Request;
pub use types::{MethodMask, RequestType, StorageIndex, MAX_LIST_ID};
