//! Two-tier document-then-chunk search: rank documents by their
//! document-level vector first, then restrict chunk search to those
//! document ids.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::HierarchicalConfig;
use crate::persistence::DocumentStore;
use crate::search::{KeywordSearchBackend, MetadataFilter, SearchError, VectorSearchBackend};
use crate::types::{CollectionId, Document, DocumentId, Hit, TenantId};

/// Searches documents first (top `top_k * document_multiplier` by
/// document-level vector similarity), then restricts chunk search to those
/// surviving documents, applying the configured score floors the reranker
/// is meant to clean up after rather than treating them as meaningful
/// quality gates (DESIGN.md open question (b)).
pub struct HierarchicalSearch {
    documents: Arc<dyn DocumentStore>,
    vector: Arc<dyn VectorSearchBackend>,
    keyword: Arc<dyn KeywordSearchBackend>,
    config: HierarchicalConfig,
}

impl HierarchicalSearch {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        vector: Arc<dyn VectorSearchBackend>,
        keyword: Arc<dyn KeywordSearchBackend>,
        config: HierarchicalConfig,
    ) -> Self {
        Self {
            documents,
            vector,
            keyword,
            config,
        }
    }

    #[tracing::instrument(skip(self, query_vector), fields(top_k))]
    pub async fn search(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query: &str,
        query_vector: &[f32],
        top_k: usize,
        metadata_filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Hit>, SearchError> {
        let document_budget = top_k * self.config.document_multiplier;

        let documents = self
            .documents
            .list_by_collection(tenant_id, collection_id)
            .await
            .map_err(|e| SearchError::KeywordSearchFailed {
                reason: e.to_string(),
            })?;
        let document_ids = rank_documents_by_vector(&documents, query_vector, document_budget);

        let (semantic_hits, keyword_hits) = tokio::try_join!(
            self.vector.search(
                tenant_id,
                collection_id,
                query_vector,
                document_budget,
                metadata_filter,
                document_ids.as_deref(),
            ),
            self.keyword.search(
                tenant_id,
                collection_id,
                query,
                document_budget,
                metadata_filter,
                document_ids.as_deref(),
            ),
        )?;

        let mut candidates: Vec<Hit> = semantic_hits
            .into_iter()
            .filter(|h| h.score >= self.config.semantic_score_threshold)
            .chain(
                keyword_hits
                    .into_iter()
                    .filter(|h| h.score >= self.config.keyword_score_threshold),
            )
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(top_k);
        Ok(candidates)
    }
}

/// Ranks `documents` by cosine similarity between `query_vector` and each
/// document's `document_vector`, returning the top `budget` ids to restrict
/// tier-2 chunk search to. A document with no vector sorts after every
/// ranked document rather than being dropped, so a collection with only
/// partial document-level embeddings still gets chunk search over the rest.
/// Returns `None` (no restriction) when the collection has no documents at
/// all — there is nothing to rank or restrict to.
fn rank_documents_by_vector(documents: &[Document], query_vector: &[f32], budget: usize) -> Option<Vec<DocumentId>> {
    if documents.is_empty() {
        return None;
    }

    let mut scored: Vec<(DocumentId, Option<f32>)> = documents
        .iter()
        .map(|document| {
            let score = document
                .document_vector
                .as_deref()
                .map(|vector| cosine_similarity(query_vector, vector));
            (document.id, score)
        })
        .collect();

    scored.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    Some(scored.into_iter().take(budget).map(|(id, _)| id).collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
