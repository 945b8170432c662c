//! Hash functions for netsieve
//!
//! Lookup tables key hostnames and domains by a 32-bit Murmur3 hash.
//! Collisions are possible, so every table re-validates candidates
//! against the full rule before reporting a match.
//!
//! # Sentinel Handling
//!
//! `0` is reserved as an "unset" marker; [`fast_hash`] never returns it.

// Seed shared by every table so hashes computed at build and match time agree
const SEED: u32 = 0x9e3779b9; // Golden ratio

/// Murmur3 32-bit hash implementation.
/// Optimized for short strings (typical domain lengths).
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let k = k.wrapping_mul(0xcc9e2d51);
        let k = k.rotate_left(15);
        let k = k.wrapping_mul(0x1b873593);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    // Process remaining bytes
    let tail = chunks.remainder();
    let mut k: u32 = 0;
    if tail.len() >= 3 {
        k ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k ^= tail[0] as u32;
        let k = k.wrapping_mul(0xcc9e2d51);
        let k = k.rotate_left(15);
        let k = k.wrapping_mul(0x1b873593);
        h ^= k;
    }

    // Finalization
    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

/// Hash a hostname or domain for table lookup.
/// ASCII-lowercases the input first; never returns 0.
#[inline]
pub fn fast_hash(value: &str) -> u32 {
    let bytes = value.as_bytes();
    let h = if bytes.iter().any(u8::is_ascii_uppercase) {
        murmur3_32(value.to_ascii_lowercase().as_bytes(), SEED)
    } else {
        murmur3_32(bytes, SEED)
    };
    if h == 0 {
        1
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_consistent() {
        let h1 = murmur3_32(b"example.com", 0);
        let h2 = murmur3_32(b"example.com", 0);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_murmur3_different_strings() {
        let h1 = murmur3_32(b"example.com", 0);
        let h2 = murmur3_32(b"example.org", 0);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_murmur3_different_seeds() {
        let h1 = murmur3_32(b"example.com", 0);
        let h2 = murmur3_32(b"example.com", 1);
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_murmur3_known_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e28b7);
        assert_eq!(murmur3_32(b"test", 0), 0xba6bd213);
    }

    #[test]
    fn test_fast_hash_never_zero() {
        for s in ["", "a", "test", "example.com", "very-long-domain-name.example.com"] {
            assert_ne!(fast_hash(s), 0, "fast_hash({s:?}) returned sentinel");
        }
    }

    #[test]
    fn test_fast_hash_case_insensitive() {
        assert_eq!(fast_hash("Example.COM"), fast_hash("example.com"));
    }
}
