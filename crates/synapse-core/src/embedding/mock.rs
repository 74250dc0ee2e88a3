//! Deterministic mock embedder, gated behind `#[cfg(any(test, feature =
//! "mock"))]` like the crate's other collaborator stubs.

use async_trait::async_trait;

use super::{Embedder, MAX_BATCH_SIZE};
use crate::embedding::EmbeddingError;
use crate::hashing::hash_to_u64;

/// Produces a vector derived from a BLAKE3 hash of the input text, so the
/// same text always embeds to the same vector and distinct texts (almost
/// certainly) don't collide — good enough for exercising the retrieval
/// pipeline without a real model.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut seed = hash_to_u64(text.as_bytes());
        (0..self.dimension)
            .map(|_| {
                // xorshift64 — cheap, deterministic, no external RNG dependency
                // needed just to fan one seed out into `dimension` floats.
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                ((seed % 2000) as f32 - 1000.0) / 1000.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for sub_batch in texts.chunks(MAX_BATCH_SIZE) {
            out.extend(sub_batch.iter().map(|t| self.vector_for(t)));
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        true
    }
}
