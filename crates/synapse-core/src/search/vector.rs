//! Vector (cosine) search over chunk points scoped to `(tenant_id,
//! collection_id, metadata_filter)`.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{Condition, Filter, SearchPointsBuilder, value::Kind};

use super::{MetadataFilter, SearchError};
use crate::types::{CollectionId, DocumentId, DocumentInfo, Hit, TenantId};

#[async_trait]
pub trait VectorSearchBackend: Send + Sync {
    /// `document_ids`, when `Some`, restricts results to chunks belonging to
    /// one of the listed documents — the tier-2 half of hierarchical search.
    async fn search(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query_vector: &[f32],
        top_k: usize,
        metadata_filter: Option<&MetadataFilter>,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError>;
}

/// Qdrant-backed implementation. A real deployment creates one collection
/// per logical index and relies on Qdrant's own payload index for the
/// `tenant_id`/`collection_id`/metadata `Condition::matches` filters.
pub struct QdrantVectorBackend {
    client: Qdrant,
    collection_name: String,
}

impl QdrantVectorBackend {
    pub fn new(client: Qdrant, collection_name: impl Into<String>) -> Self {
        Self {
            client,
            collection_name: collection_name.into(),
        }
    }
}

#[async_trait]
impl VectorSearchBackend for QdrantVectorBackend {
    #[tracing::instrument(skip(self, query_vector), fields(top_k))]
    async fn search(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query_vector: &[f32],
        top_k: usize,
        metadata_filter: Option<&MetadataFilter>,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError> {
        let mut must = vec![
            Condition::matches("tenant_id", tenant_id.to_string()),
            Condition::matches("collection_id", collection_id.to_string()),
        ];
        if let Some(filter) = metadata_filter {
            for (key, value) in filter {
                must.push(Condition::matches(format!("metadata.{key}"), value.clone()));
            }
        }

        let search_builder = SearchPointsBuilder::new(
            self.collection_name.clone(),
            query_vector.to_vec(),
            top_k as u64,
        )
        .with_payload(true)
        .filter(Filter::must(must));

        let response = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| SearchError::VectorSearchFailed {
                reason: e.to_string(),
            })?;

        let hits = response.result.into_iter().filter_map(|point| point_to_hit(point, collection_id));

        Ok(match document_ids {
            Some(allowed) => hits.filter(|hit| allowed.contains(&hit.document.id)).collect(),
            None => hits.collect(),
        })
    }
}

fn point_to_hit(
    point: qdrant_client::qdrant::ScoredPoint,
    collection_id: CollectionId,
) -> Option<Hit> {
    let chunk_id = point.id.as_ref().and_then(|id| match &id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s)) => s.parse().ok(),
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => {
            Some(uuid::Uuid::from_u128(*n as u128))
        }
        None => None,
    })?;

    let payload = point.payload;
    let content = payload_string(&payload, "content").unwrap_or_default();
    let document_id = payload_string(&payload, "document_id")?;
    let title = payload_string(&payload, "title").unwrap_or_default();
    let filename = payload_string(&payload, "filename").unwrap_or_default();
    let chunk_index = payload
        .get("chunk_index")
        .and_then(value_as_i64)
        .unwrap_or(0) as i32;

    Some(Hit {
        chunk_id,
        content,
        chunk_index,
        score: point.score,
        rerank_score: None,
        metadata: HashMap::new(),
        chunk_metadata: HashMap::new(),
        document: DocumentInfo {
            id: document_id.parse().ok()?,
            title,
            filename,
        },
        collection_id,
        expanded_content: None,
        context_window: None,
    })
}

fn payload_string(
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> Option<String> {
    payload.get(key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    })
}

fn value_as_i64(v: &qdrant_client::qdrant::Value) -> Option<i64> {
    match &v.kind {
        Some(Kind::IntegerValue(i)) => Some(*i),
        _ => None,
    }
}
