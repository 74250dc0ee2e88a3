//! Read-through cache decorator for any [`Embedder`], keeping the cache
//! concern out of the embedding backend itself.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Embedder, EmbeddingError};
use crate::cache::{CacheStore, Keyspace};
use crate::hashing::embedding_key;
use crate::types::TenantId;

/// Wraps an [`Embedder`] with a read-through cache against the
/// `embedding:` keyspace. Cache misses or serialization errors fall through
/// to the inner embedder rather than failing the request.
pub struct CachingEmbedder<E: Embedder> {
    inner: E,
    cache: Arc<dyn CacheStore>,
    tenant_id: TenantId,
}

impl<E: Embedder> CachingEmbedder<E> {
    pub fn new(inner: E, cache: Arc<dyn CacheStore>, tenant_id: TenantId) -> Self {
        Self {
            inner,
            cache,
            tenant_id,
        }
    }
}

#[async_trait]
impl<E: Embedder + Send + Sync> Embedder for CachingEmbedder<E> {
    #[tracing::instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = embedding_key(text);
        if let Some(cached) = self.cache.get(Keyspace::Embedding, &key)
            && let Ok(vector) = serde_json::from_slice::<Vec<f32>>(&cached)
        {
            return Ok(vector);
        }

        let vector = self.inner.embed(text).await?;
        if let Ok(bytes) = serde_json::to_vec(&vector) {
            self.cache.set(Keyspace::Embedding, key, self.tenant_id, bytes);
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        // Per-item cache lookups preserve the read-through property without
        // requiring a batch cache key; the inner embedder's own batch limit
        // still applies to whatever falls through as a miss.
        let mut results = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();
        let mut miss_positions = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let key = embedding_key(text);
            match self
                .cache
                .get(Keyspace::Embedding, &key)
                .and_then(|bytes| serde_json::from_slice::<Vec<f32>>(&bytes).ok())
            {
                Some(vector) => results.push(Some(vector)),
                None => {
                    results.push(None);
                    misses.push(text.clone());
                    miss_positions.push(i);
                }
            }
        }

        if !misses.is_empty() {
            let embedded = self.inner.embed_batch(&misses).await?;
            for (pos, (text, vector)) in miss_positions.into_iter().zip(misses.iter().zip(embedded)) {
                let key = embedding_key(text);
                if let Ok(bytes) = serde_json::to_vec(&vector) {
                    self.cache.set(Keyspace::Embedding, key, self.tenant_id, bytes);
                }
                results[pos] = Some(vector);
            }
        }

        Ok(results.into_iter().map(|r| r.expect("every position filled")).collect())
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
