use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::llm::mock::MockLlmClient;
use crate::types::DocumentInfo;

struct FixedRetriever(HashMap<String, Vec<Hit>>);

#[async_trait]
impl SubQueryRetriever for FixedRetriever {
    async fn retrieve(
        &self,
        _tenant_id: TenantId,
        _collection_id: CollectionId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Hit>, ReasoningError> {
        Ok(self.0.get(query).cloned().unwrap_or_default().into_iter().take(top_k).collect())
    }
}

fn hit(chunk_id: Uuid, score: f32) -> Hit {
    Hit {
        chunk_id,
        content: "content".to_string(),
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
async fn decompose_keeps_original_query_at_index_zero() {
    let llm = Arc::new(MockLlmClient::new(vec!["- What is X?\n- How does X relate to Y?"]));
    let retriever = Arc::new(FixedRetriever(HashMap::new()));
    let reasoner = DeepReasoner::new(retriever, llm, DeepReasoningConfig::default());

    let sub_queries = reasoner.decompose("What is the relationship between X and Y?").await;

    assert_eq!(sub_queries[0], "What is the relationship between X and Y?");
    assert_eq!(sub_queries.len(), 3);
    assert_eq!(sub_queries[1], "What is X?");
}

#[tokio::test]
async fn decompose_falls_back_to_the_original_query_when_parsing_yields_nothing() {
    let llm = Arc::new(MockLlmClient::new(vec!["   \n   "]));
    let retriever = Arc::new(FixedRetriever(HashMap::new()));
    let reasoner = DeepReasoner::new(retriever, llm, DeepReasoningConfig::default());

    let sub_queries = reasoner.decompose("original question").await;

    assert_eq!(sub_queries, vec!["original question".to_string()]);
}

#[tokio::test]
async fn retrieve_all_dedups_by_first_occurrence_across_sub_queries() {
    let shared_chunk = Uuid::new_v4();
    let mut data = HashMap::new();
    data.insert("a".to_string(), vec![hit(shared_chunk, 0.9), hit(Uuid::new_v4(), 0.5)]);
    data.insert("b".to_string(), vec![hit(shared_chunk, 0.2), hit(Uuid::new_v4(), 0.4)]);

    let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let retriever = Arc::new(FixedRetriever(data));
    let reasoner = DeepReasoner::new(retriever, llm, DeepReasoningConfig::default());

    let merged = reasoner
        .retrieve_all(Uuid::new_v4(), Uuid::new_v4(), &["a".to_string(), "b".to_string()])
        .await
        .unwrap();

    assert_eq!(merged.len(), 3);
    let kept = merged.iter().find(|h| h.chunk_id == shared_chunk).unwrap();
    assert_eq!(kept.score, 0.9, "first occurrence (from sub-query \"a\") must win");
}

#[tokio::test]
async fn synthesize_sorts_descending_and_truncates_to_double_top_k() {
    let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let retriever = Arc::new(FixedRetriever(HashMap::new()));
    let reasoner = DeepReasoner::new(retriever, llm, DeepReasoningConfig::default());

    let hits = vec![hit(Uuid::new_v4(), 0.1), hit(Uuid::new_v4(), 0.9), hit(Uuid::new_v4(), 0.5)];
    let synthesized = reasoner.synthesize(hits, 1);

    assert_eq!(synthesized.len(), 2);
    assert_eq!(synthesized[0].score, 0.9);
    assert_eq!(synthesized[1].score, 0.5);
}
