//! Vector, keyword and hybrid search.

mod error;
mod keyword;
mod metadata_filter;
mod rrf;
mod vector;

pub use error::SearchError;
pub use keyword::KeywordSearchBackend;
#[cfg(feature = "mock")]
pub use keyword::MockKeywordBackend;
pub use metadata_filter::{MetadataFilter, validate_metadata_filter};
pub use rrf::{reciprocal_rank_fusion, reciprocal_rank_fusion_default};
pub use vector::{QdrantVectorBackend, VectorSearchBackend};

use crate::types::{CollectionId, DocumentId, Hit, TenantId};

/// Runs vector and keyword search at `top_k * 2` candidates each and fuses
/// them with [`reciprocal_rank_fusion_default`], truncating to `top_k`.
pub async fn hybrid_search(
    vector: &dyn VectorSearchBackend,
    keyword: &dyn KeywordSearchBackend,
    tenant_id: TenantId,
    collection_id: CollectionId,
    query: &str,
    query_vector: &[f32],
    top_k: usize,
    metadata_filter: Option<&MetadataFilter>,
    document_ids: Option<&[DocumentId]>,
) -> Result<Vec<Hit>, SearchError> {
    let (vector_hits, keyword_hits) = tokio::try_join!(
        vector.search(tenant_id, collection_id, query_vector, top_k * 2, metadata_filter, document_ids),
        keyword.search(tenant_id, collection_id, query, top_k * 2, metadata_filter, document_ids),
    )?;

    let mut fused = reciprocal_rank_fusion_default(&[vector_hits, keyword_hits]);
    fused.truncate(top_k);
    Ok(fused)
}
