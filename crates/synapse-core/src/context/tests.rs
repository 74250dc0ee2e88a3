use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::persistence::mock::MockChunkStore;
use crate::types::{Chunk, DocumentInfo};

fn chunk(document_id: Uuid, index: i32) -> Chunk {
    Chunk {
        chunk_id: Uuid::new_v4(),
        document_id,
        collection_id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        chunk_index: index,
        content: format!("chunk {index}"),
        search_content: format!("chunk {index}"),
        vector: None,
        metadata: HashMap::new(),
        chunk_metadata: HashMap::new(),
    }
}

fn hit(document_id: Uuid, chunk_index: i32, score: f32) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: format!("chunk {chunk_index}"),
        chunk_index,
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
        context_window: None,
    }
}

#[tokio::test]
async fn merges_neighboring_chunks_into_expanded_content() {
    let store = Arc::new(MockChunkStore::default());
    let document_id = Uuid::new_v4();
    let chunks = (0..5).map(|i| chunk(document_id, i)).collect::<Vec<_>>();
    store.upsert_many(chunks).await.unwrap();

    let expander = ContextExpander::new(store, ContextConfig::default());
    let hits = vec![hit(document_id, 2, 0.9)];
    let expanded = expander.expand(hits).await.unwrap();

    assert_eq!(expanded.len(), 1);
    let window = expanded[0].context_window.as_ref().unwrap();
    assert_eq!(window.start_index, 1);
    assert_eq!(window.end_index, 4);
    assert_eq!(window.chunks_merged, 4);
    assert_eq!(
        expanded[0].expanded_content.as_deref(),
        Some("chunk 1\n\nchunk 2\n\nchunk 3\n\nchunk 4")
    );
}

#[tokio::test]
async fn clamps_end_index_to_the_last_available_chunk() {
    let store = Arc::new(MockChunkStore::default());
    let document_id = Uuid::new_v4();
    store.upsert_many(vec![chunk(document_id, 0), chunk(document_id, 1)]).await.unwrap();

    let expander = ContextExpander::new(store, ContextConfig::default());
    let hits = vec![hit(document_id, 0, 0.9)];
    let expanded = expander.expand(hits).await.unwrap();

    let window = expanded[0].context_window.as_ref().unwrap();
    assert_eq!(window.end_index, 1);
}

#[tokio::test]
async fn drops_lower_scoring_hit_whose_window_overlaps_a_higher_one() {
    let store = Arc::new(MockChunkStore::default());
    let document_id = Uuid::new_v4();
    let chunks = (0..10).map(|i| chunk(document_id, i)).collect::<Vec<_>>();
    store.upsert_many(chunks).await.unwrap();

    let expander = ContextExpander::new(store, ContextConfig::default());
    // Window for index 5 is [4,7]; window for index 6 is [5,8] -- they overlap.
    let hits = vec![hit(document_id, 6, 0.4), hit(document_id, 5, 0.9)];
    let expanded = expander.expand(hits).await.unwrap();

    assert_eq!(expanded.len(), 1);
    assert_eq!(expanded[0].chunk_index, 5);
}
