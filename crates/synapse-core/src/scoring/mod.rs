//! Cross-encoder reranking of retrieved chunks.

mod cross_encoder;
mod error;
mod identity;
#[cfg(test)]
mod tests;

pub use cross_encoder::CrossEncoderReranker;
pub use error::RerankError;
pub use identity::IdentityReranker;

use async_trait::async_trait;

use crate::types::Hit;

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reranks `hits` against `query`, returning them sorted by
    /// `rerank_score` descending with `rerank_score` populated on each.
    async fn rerank(&self, query: &str, hits: Vec<Hit>) -> Result<Vec<Hit>, RerankError>;

    /// Like [`Reranker::rerank`], but drops any hit scoring below `threshold`.
    async fn rerank_with_threshold(
        &self,
        query: &str,
        hits: Vec<Hit>,
        threshold: f32,
    ) -> Result<Vec<Hit>, RerankError> {
        let reranked = self.rerank(query, hits).await?;
        Ok(reranked
            .into_iter()
            .filter(|h| h.rerank_score.unwrap_or(f32::MIN) >= threshold)
            .collect())
    }

    fn is_available(&self) -> bool;
}
