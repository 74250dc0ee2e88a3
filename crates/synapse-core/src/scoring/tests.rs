use super::*;
use crate::types::DocumentInfo;
use std::collections::HashMap;
use uuid::Uuid;

fn sample_hit(score: f32) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: "some chunk content".to_string(),
        chunk_index: 0,
        score,
        rerank_score: None,
        metadata: HashMap::new(),
        chunk_metadata: HashMap::new(),
        document: DocumentInfo {
            id: Uuid::new_v4(),
            title: "doc".to_string(),
            filename: "doc.pdf".to_string(),
        },
        collection_id: Uuid::new_v4(),
        expanded_content: None,
        context_window: None,
    }
}

#[tokio::test]
async fn identity_reranker_reports_unavailable_and_passes_through() {
    let reranker = IdentityReranker;
    let hits = vec![sample_hit(0.9), sample_hit(0.1)];
    let reranked = reranker.rerank("query", hits.clone()).await.unwrap();
    assert!(!reranker.is_available());
    assert_eq!(reranked.len(), hits.len());
    assert!(reranked[0].rerank_score.is_none());
}

#[tokio::test]
async fn threshold_drops_hits_with_no_rerank_score() {
    // IdentityReranker never populates rerank_score, so the default
    // rerank_with_threshold implementation treats every hit as below any
    // positive threshold — exercising that fallback, not a real model.
    let reranker = IdentityReranker;
    let hits = vec![sample_hit(0.9), sample_hit(0.1)];
    let filtered = reranker
        .rerank_with_threshold("query", hits, 0.5)
        .await
        .unwrap();
    assert!(filtered.is_empty());
}
