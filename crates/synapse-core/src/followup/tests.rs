use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::llm::mock::MockLlmClient;
use crate::types::DocumentInfo;

fn hit_with(content: &str, metadata: HashMap<String, serde_json::Value>, chunk_metadata: HashMap<String, serde_json::Value>) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: content.to_string(),
        chunk_index: 0,
        score: 1.0,
        rerank_score: None,
        metadata,
        chunk_metadata,
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

#[test]
fn extracts_table_media_from_markdown_table_content() {
    let service = FollowUpService::new(Arc::new(MockLlmClient::new(Vec::<String>::new())));
    let content = "| a | b |\n| --- | --- |\n| 1 | 2 |";
    let hit = hit_with(content, HashMap::new(), HashMap::new());

    let media = service.extract_media(&[hit]);
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].media_type, MediaType::Table);
}

#[test]
fn extracts_image_media_from_chunk_metadata_flag() {
    let service = FollowUpService::new(Arc::new(MockLlmClient::new(Vec::<String>::new())));
    let mut chunk_metadata = HashMap::new();
    chunk_metadata.insert("has_image".to_string(), serde_json::Value::Bool(true));
    let hit = hit_with("no markers here", HashMap::new(), chunk_metadata);

    let media = service.extract_media(&[hit]);
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].media_type, MediaType::Image);
}

#[test]
fn dedups_media_by_type_document_and_description() {
    let service = FollowUpService::new(Arc::new(MockLlmClient::new(Vec::<String>::new())));
    let mut chunk_metadata = HashMap::new();
    chunk_metadata.insert("has_image".to_string(), serde_json::Value::Bool(true));
    let mut hit = hit_with("plain", HashMap::new(), chunk_metadata);
    let doc_id = Uuid::new_v4();
    hit.document.id = doc_id;
    let duplicate = hit.clone();

    let media = service.extract_media(&[hit, duplicate]);
    assert_eq!(media.len(), 1);
}

#[tokio::test]
async fn returns_empty_on_malformed_model_output() {
    let service = FollowUpService::new(Arc::new(MockLlmClient::new(vec!["not json"])));
    let questions = service.generate_follow_ups("q", "r", &[], None).await;
    assert!(questions.is_empty());
}

#[tokio::test]
async fn caps_generated_questions_at_three() {
    let response = serde_json::json!({
        "questions": [
            {"question": "a", "relevance": "r"},
            {"question": "b", "relevance": "r"},
            {"question": "c", "relevance": "r"},
            {"question": "d", "relevance": "r"},
        ]
    })
    .to_string();
    let service = FollowUpService::new(Arc::new(MockLlmClient::new(vec![response])));

    let questions = service.generate_follow_ups("q", "r", &[], None).await;
    assert_eq!(questions.len(), 3);
}
