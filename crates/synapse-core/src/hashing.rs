//! Cache-key and internal-label hashing.
//!
//! Cache keys use the full 256-bit SHA-256 digest. Truncating to fewer bits
//! is a defect: at the query volumes this system is built for, a 64-bit
//! space collides often enough to matter. [`hash_to_u64`] is kept for the
//! one class of use where collisions are harmless — sharding or labeling
//! identifiers that are never used as a lookup key — and must never be
//! repurposed as a cache key.

use sha2::{Digest, Sha256};

/// Full SHA-256 digest of arbitrary bytes.
#[inline]
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Cache key for the `embedding:` keyspace: `sha256(text)`.
#[inline]
pub fn embedding_key(text: &str) -> [u8; 32] {
    sha256(text.as_bytes())
}

/// Cache key for the `query_reform:` keyspace: `sha256(query || mode)`.
#[inline]
pub fn query_reform_key(query: &str, mode: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(query.len() + mode.len() + 1);
    buf.extend_from_slice(query.as_bytes());
    buf.push(0); // separator byte prevents "ab"+"c" colliding with "a"+"bc"
    buf.extend_from_slice(mode.as_bytes());
    sha256(&buf)
}

/// Cache key for the `search:` keyspace: `sha256(query || canonical_json(params))`.
///
/// `canonical_params_json` must already be a canonical (stable key order)
/// serialization of the search parameters — callers build it via
/// `serde_json::to_value` on a struct with deterministic field order plus
/// `serde_json::to_string` (the `serde_json` object-key order follows
/// declaration order, which is deterministic for a fixed struct).
#[inline]
pub fn search_key(query: &str, canonical_params_json: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(query.len() + canonical_params_json.len() + 1);
    buf.extend_from_slice(query.as_bytes());
    buf.push(0);
    buf.extend_from_slice(canonical_params_json.as_bytes());
    sha256(&buf)
}

/// Truncated BLAKE3 hash (first 8 bytes) for non-collision-critical internal
/// uses: sharding keys across a fixed number of buckets, log-line
/// correlation ids, metrics labels. **Never** use this for a cache key or
/// anywhere uniqueness is load-bearing — use [`sha256`] instead.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes = hash.as_bytes();
    u64::from_le_bytes(bytes[0..8].try_into().expect("blake3 hash is 32 bytes"))
}

/// Stable synthetic id for a graph reference missing both `reference_id`
/// and `file_path`/`content` hints. Uses BLAKE3 rather than pulling in a
/// second hash crate purely for id synthesis; two references with identical
/// (or both-empty) input collide by design here — the source dedup pass is
/// what resolves that collision, not this function.
#[inline]
pub fn synthetic_id(seed: &str) -> String {
    blake3::hash(seed.as_bytes()).to_hex()[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_key_is_deterministic() {
        assert_eq!(embedding_key("hello"), embedding_key("hello"));
        assert_ne!(embedding_key("hello"), embedding_key("world"));
    }

    #[test]
    fn search_key_uses_full_digest_width() {
        let key = search_key("what is RAG", r#"{"mode":"hybrid"}"#);
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn separator_prevents_concatenation_ambiguity() {
        // Without a separator byte, ("ab", "c") and ("a", "bc") would collide.
        let a = query_reform_key("ab", "c");
        let b = query_reform_key("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn hash_to_u64_is_not_used_for_cache_keys_width() {
        // Sanity check the narrower width is real, so callers can't mistake
        // it for a 256-bit key.
        assert_eq!(std::mem::size_of_val(&hash_to_u64(b"x")), 8);
    }

    #[test]
    fn synthetic_id_is_deterministic_and_short() {
        let a = synthetic_id("/docs/report.pdf");
        let b = synthetic_id("/docs/report.pdf");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
