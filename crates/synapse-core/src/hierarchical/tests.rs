use super::*;
use crate::persistence::mock::MockDocumentStore;
use crate::search::MockKeywordBackend;
use crate::types::{ContextWindow, DocumentInfo, DocumentStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

struct FixedVectorBackend(Vec<Hit>);

#[async_trait]
impl VectorSearchBackend for FixedVectorBackend {
    async fn search(
        &self,
        _tenant_id: TenantId,
        _collection_id: CollectionId,
        _query_vector: &[f32],
        top_k: usize,
        _metadata_filter: Option<&MetadataFilter>,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError> {
        let hits = self.0.iter().cloned();
        let filtered: Vec<Hit> = match document_ids {
            Some(allowed) => hits.filter(|h| allowed.contains(&h.document.id)).collect(),
            None => hits.collect(),
        };
        Ok(filtered.into_iter().take(top_k).collect())
    }
}

fn hit(score: f32) -> Hit {
    hit_for(Uuid::new_v4(), score)
}

fn hit_for(document_id: Uuid, score: f32) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: "content".to_string(),
        chunk_index: 0,
        score,
        rerank_score: None,
        metadata: HashMap::new(),
        chunk_metadata: HashMap::new(),
        document: DocumentInfo {
            id: document_id,
            title: "doc".to_string(),
            filename: "doc.pdf".to_string(),
        },
        collection_id: Uuid::new_v4(),
        expanded_content: None,
        context_window: None as Option<ContextWindow>,
    }
}

fn sample_document(id: DocumentId, tenant_id: TenantId, collection_id: CollectionId, vector: Vec<f32>) -> Document {
    Document {
        id,
        tenant_id,
        collection_id,
        title: "doc".to_string(),
        filename: "doc.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        status: DocumentStatus::Completed,
        document_vector: Some(vector),
        summary: None,
        domain_processor: None,
    }
}

#[tokio::test]
async fn filters_below_semantic_score_floor() {
    let documents = Arc::new(MockDocumentStore::default());
    let keyword = Arc::new(MockKeywordBackend::new(documents.clone(), Arc::new(crate::persistence::mock::MockChunkStore::default())));
    let vector = Arc::new(FixedVectorBackend(vec![hit(0.5), hit(0.1)]));
    let search = HierarchicalSearch::new(documents, vector, keyword, HierarchicalConfig::default());

    let results = search
        .search(Uuid::new_v4(), Uuid::new_v4(), "q", &[0.0; 4], 10, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 0.5);
}

#[tokio::test]
async fn restricts_chunk_search_to_top_ranked_documents() {
    let tenant_id = Uuid::new_v4();
    let collection_id = Uuid::new_v4();
    let matching_doc = Uuid::new_v4();
    let distant_doc = Uuid::new_v4();

    let documents = Arc::new(MockDocumentStore::default());
    documents
        .upsert(sample_document(matching_doc, tenant_id, collection_id, vec![1.0, 0.0, 0.0, 0.0]))
        .await
        .unwrap();
    documents
        .upsert(sample_document(distant_doc, tenant_id, collection_id, vec![0.0, 1.0, 0.0, 0.0]))
        .await
        .unwrap();

    let keyword = Arc::new(MockKeywordBackend::new(documents.clone(), Arc::new(crate::persistence::mock::MockChunkStore::default())));
    let vector = Arc::new(FixedVectorBackend(vec![hit_for(matching_doc, 0.9), hit_for(distant_doc, 0.9)]));

    let mut config = HierarchicalConfig::default();
    config.document_multiplier = 1;

    let search = HierarchicalSearch::new(documents, vector, keyword, config);

    let results = search
        .search(tenant_id, collection_id, "q", &[1.0, 0.0, 0.0, 0.0], 1, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, matching_doc);
}

#[tokio::test]
async fn no_documents_means_no_restriction() {
    let documents = Arc::new(MockDocumentStore::default());
    let keyword = Arc::new(MockKeywordBackend::new(documents.clone(), Arc::new(crate::persistence::mock::MockChunkStore::default())));
    let vector = Arc::new(FixedVectorBackend(vec![hit(0.9)]));
    let search = HierarchicalSearch::new(documents, vector, keyword, HierarchicalConfig::default());

    let results = search
        .search(Uuid::new_v4(), Uuid::new_v4(), "q", &[0.0; 4], 10, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
}
