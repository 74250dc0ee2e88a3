use async_trait::async_trait;

use super::{RerankError, Reranker};
use crate::types::Hit;

/// Explicit "reranker unavailable" type, used in place of an
/// `if reranker.is_some()` branch scattered through callers. Returns hits
/// unchanged (already sorted by their incoming `score`), reporting itself
/// unavailable so callers skip the rerank step.
#[derive(Debug, Default)]
pub struct IdentityReranker;

#[async_trait]
impl Reranker for IdentityReranker {
    async fn rerank(&self, _query: &str, hits: Vec<Hit>) -> Result<Vec<Hit>, RerankError> {
        Ok(hits)
    }

    fn is_available(&self) -> bool {
        false
    }
}
