//! In-process cache for embeddings, query reformulations, and search results.
//!
//! Three keyspaces, each a `moka::sync::Cache` with its own TTL per
//! [`crate::config::CacheConfig`]. Keys are full 32-byte SHA-256 digests
//! (see [`crate::hashing`]) — never a truncated hash, which would raise the
//! collision rate at the query volumes this cache is sized for.
//!
//! Cache failures are best-effort: a caller that can't read or write the
//! cache falls through to computing the value directly. [`CacheStore::get`]/
//! [`set`] return `Option`/`Result` the caller is expected to `.ok()` away
//! rather than abort a request over.

mod error;
#[cfg(test)]
mod tests;

pub use error::CacheError;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};

use crate::config::CacheConfig;
use crate::types::TenantId;

/// Which of the three cache keyspaces an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyspace {
    Embedding,
    QueryReform,
    Search,
}

/// Opaque cached payload, tagged with the tenant that produced it so a
/// tenant-scoped invalidation sweep can find it without a secondary index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryValue {
    pub tenant_id: TenantId,
    pub bytes: Vec<u8>,
}

/// Point-in-time counters for `/ready`-style observability.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub enabled: bool,
    pub total_keys: u64,
    pub hit_rate: f64,
}

/// Cache contract every orchestrator component reads/writes through.
pub trait CacheStore: Send + Sync {
    fn get(&self, keyspace: Keyspace, key: &[u8; 32]) -> Option<Vec<u8>>;
    fn set(&self, keyspace: Keyspace, key: [u8; 32], tenant_id: TenantId, value: Vec<u8>);
    /// Removes a single entry, for a caller that has determined its own
    /// cached value is corrupt (unparseable or schema-mismatched) and must
    /// not be served again before it naturally expires.
    fn evict(&self, keyspace: Keyspace, key: &[u8; 32]);
    /// Removes every entry across all keyspaces tagged with `tenant_id`.
    fn invalidate_tenant(&self, tenant_id: TenantId);
    fn stats(&self) -> CacheStats;
}

/// The in-process cache implementation, always available (no external
/// dependency), used both in production and in `mock`-feature deployments.
pub struct MokaCacheStore {
    enabled: bool,
    embedding: Cache<[u8; 32], CacheEntryValue>,
    query_reform: Cache<[u8; 32], CacheEntryValue>,
    search: Cache<[u8; 32], CacheEntryValue>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MokaCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            embedding: build_keyspace(config.max_entries_per_keyspace, config.embedding_ttl),
            query_reform: build_keyspace(config.max_entries_per_keyspace, config.query_reform_ttl),
            search: build_keyspace(config.max_entries_per_keyspace, config.search_ttl),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn keyspace_cache(&self, keyspace: Keyspace) -> &Cache<[u8; 32], CacheEntryValue> {
        match keyspace {
            Keyspace::Embedding => &self.embedding,
            Keyspace::QueryReform => &self.query_reform,
            Keyspace::Search => &self.search,
        }
    }
}

fn build_keyspace(max_capacity: u64, ttl: Duration) -> Cache<[u8; 32], CacheEntryValue> {
    Cache::builder()
        .max_capacity(max_capacity)
        .time_to_live(ttl)
        .build()
}

impl CacheStore for MokaCacheStore {
    #[tracing::instrument(skip(self), fields(keyspace = ?keyspace))]
    fn get(&self, keyspace: Keyspace, key: &[u8; 32]) -> Option<Vec<u8>> {
        if !self.enabled {
            return None;
        }
        let hit = self.keyspace_cache(keyspace).get(key);
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit.map(|entry| entry.bytes)
    }

    #[tracing::instrument(skip(self, value), fields(keyspace = ?keyspace))]
    fn set(&self, keyspace: Keyspace, key: [u8; 32], tenant_id: TenantId, value: Vec<u8>) {
        if !self.enabled {
            return;
        }
        self.keyspace_cache(keyspace).insert(
            key,
            CacheEntryValue {
                tenant_id,
                bytes: value,
            },
        );
    }

    #[tracing::instrument(skip(self), fields(keyspace = ?keyspace))]
    fn evict(&self, keyspace: Keyspace, key: &[u8; 32]) {
        self.keyspace_cache(keyspace).invalidate(key);
    }

    #[tracing::instrument(skip(self))]
    fn invalidate_tenant(&self, tenant_id: TenantId) {
        for cache in [&self.embedding, &self.query_reform, &self.search] {
            let keys: Vec<[u8; 32]> = cache
                .iter()
                .filter(|(_, v)| v.tenant_id == tenant_id)
                .map(|(k, _)| *k)
                .collect();
            for key in keys {
                cache.invalidate(&key);
            }
        }
    }

    fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        CacheStats {
            enabled: self.enabled,
            total_keys: self.embedding.entry_count()
                + self.query_reform.entry_count()
                + self.search.entry_count(),
            hit_rate,
        }
    }
}
