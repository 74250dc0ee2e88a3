//! Text embedding.
//!
//! - [`candle_embedder`] is the real BERT-family encoder.
//! - [`mock`] is a deterministic stand-in for tests and `mock`-feature
//!   deployments.
//! - [`caching`] wraps either one with a read-through cache.

mod caching;
mod candle_embedder;
mod dim;
mod error;
#[cfg(feature = "mock")]
pub mod mock;

pub use caching::CachingEmbedder;
pub use candle_embedder::CandleEmbedder;
pub use dim::{DimConfig, DimValidationError};
pub use error::EmbeddingError;

use async_trait::async_trait;

/// Batches larger than this are split into consecutive sub-batches of at
/// most this size and the results concatenated, preserving input order.
pub const MAX_BATCH_SIZE: usize = 100;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
    fn dimension(&self) -> usize;
    fn is_available(&self) -> bool;
}
