//! Full-text keyword search. Vector similarity and full-text match are
//! assumed to be pushed into the underlying store — a real deployment
//! backs this with the persistence collaborator's own full-text index
//! (e.g. Postgres `tsvector`/`ts_rank`). This crate only owns the trait
//! plus a `mock`-feature in-memory term-overlap stand-in for tests.

use async_trait::async_trait;

use super::{MetadataFilter, SearchError};
use crate::types::{CollectionId, DocumentId, Hit, TenantId};

#[async_trait]
pub trait KeywordSearchBackend: Send + Sync {
    /// `document_ids`, when `Some`, restricts results to chunks belonging to
    /// one of the listed documents — the tier-2 half of hierarchical search.
    async fn search(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query: &str,
        top_k: usize,
        metadata_filter: Option<&MetadataFilter>,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError>;
}

#[cfg(feature = "mock")]
pub use mock::MockKeywordBackend;

#[cfg(feature = "mock")]
mod mock {
    use std::sync::Arc;

    use super::*;
    use crate::persistence::{ChunkStore, DocumentStore};
    use crate::types::DocumentInfo;

    /// Scores each candidate chunk by the fraction of query terms it
    /// contains (case-insensitive whitespace tokenization), standing in for
    /// a real `ts_rank`-style backend in tests.
    pub struct MockKeywordBackend {
        documents: Arc<dyn DocumentStore>,
        chunks: Arc<dyn ChunkStore>,
    }

    impl MockKeywordBackend {
        pub fn new(documents: Arc<dyn DocumentStore>, chunks: Arc<dyn ChunkStore>) -> Self {
            Self { documents, chunks }
        }
    }

    #[async_trait]
    impl KeywordSearchBackend for MockKeywordBackend {
        async fn search(
            &self,
            tenant_id: TenantId,
            collection_id: CollectionId,
            query: &str,
            top_k: usize,
            metadata_filter: Option<&MetadataFilter>,
            document_ids: Option<&[DocumentId]>,
        ) -> Result<Vec<Hit>, SearchError> {
            let terms: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
            if terms.is_empty() {
                return Ok(Vec::new());
            }

            let documents = self
                .documents
                .list_by_collection(tenant_id, collection_id)
                .await
                .map_err(|e| SearchError::KeywordSearchFailed {
                    reason: e.to_string(),
                })?;

            let mut hits = Vec::new();
            for document in documents {
                if let Some(allowed) = document_ids
                    && !allowed.contains(&document.id)
                {
                    continue;
                }
                if let Some(filter) = metadata_filter
                    && let Some(doc_type) = filter.get("document_type")
                    && document.domain_processor.as_deref() != Some(doc_type.as_str())
                {
                    continue;
                }

                let chunks = self
                    .chunks
                    .get_window(document.id, i32::MIN, i32::MAX)
                    .await
                    .map_err(|e| SearchError::KeywordSearchFailed {
                        reason: e.to_string(),
                    })?;

                for chunk in chunks {
                    let lower = chunk.search_content.to_lowercase();
                    let matched = terms.iter().filter(|t| lower.contains(t.as_str())).count();
                    if matched == 0 {
                        continue;
                    }
                    let score = matched as f32 / terms.len() as f32;
                    hits.push(Hit {
                        chunk_id: chunk.chunk_id,
                        content: chunk.content,
                        chunk_index: chunk.chunk_index,
                        score,
                        rerank_score: None,
                        metadata: chunk.chunk_metadata.clone(),
                        chunk_metadata: chunk.chunk_metadata,
                        document: DocumentInfo {
                            id: document.id,
                            title: document.title.clone(),
                            filename: document.filename.clone(),
                        },
                        collection_id,
                        expanded_content: None,
                        context_window: None,
                    });
                }
            }

            hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            hits.truncate(top_k);
            Ok(hits)
        }
    }
}
