use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::llm::mock::MockLlmClient;
use crate::types::DocumentInfo;

fn hit(content: &str) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: content.to_string(),
        chunk_index: 0,
        score: 1.0,
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

fn enabled_config() -> JudgeConfig {
    JudgeConfig {
        enabled: true,
        model: "test-model".to_string(),
        timeout: std::time::Duration::from_secs(1),
    }
}

#[tokio::test]
async fn disabled_judge_reports_full_confidence_without_calling_the_model() {
    let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let judge = Judge::new(llm, JudgeConfig { enabled: false, ..enabled_config() });

    let analysis = judge.pre_analyze_context(&[hit("some content")], "question").await;
    assert!(!analysis.has_facts());

    let validation = judge.validate_response("an answer", &analysis, "question").await;
    assert_eq!(validation.confidence, 1.0);
    assert!(!validation.needs_correction);
}

#[tokio::test]
async fn validation_with_no_extracted_facts_reports_reduced_confidence() {
    let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let judge = Judge::new(llm, enabled_config());

    let analysis = ContextAnalysis::default();
    let validation = judge.validate_response("an answer", &analysis, "question").await;

    assert_eq!(validation.confidence, 0.7);
}

#[tokio::test]
async fn validation_failure_reports_midpoint_confidence() {
    let llm = Arc::new(MockLlmClient::new(vec!["not valid json"]));
    let judge = Judge::new(llm, enabled_config());

    let analysis = ContextAnalysis {
        claims: vec![ExtractedFact { value: "fact".to_string(), context: "ctx".to_string() }],
        ..Default::default()
    };
    let validation = judge.validate_response("an answer", &analysis, "question").await;

    assert_eq!(validation.confidence, 0.5);
}

#[tokio::test]
async fn correction_is_skipped_when_no_issue_clears_the_severity_bar() {
    let llm = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let judge = Judge::new(llm, enabled_config());

    let validation = ValidationResult {
        issues: vec![Issue {
            issue_type: "MISSED_INFO".to_string(),
            claim: "claim".to_string(),
            fact: None,
            correction: None,
            severity: "low".to_string(),
        }],
        confidence: 0.8,
        needs_correction: true,
        relevance_score: 1.0,
        completeness_score: 1.0,
    };

    let corrected = judge.correct_response("original answer", &validation, &ContextAnalysis::default()).await;
    assert_eq!(corrected, "original answer");
}

#[tokio::test]
async fn correction_applies_the_model_output_for_significant_issues() {
    let llm = Arc::new(MockLlmClient::new(vec!["corrected answer"]));
    let judge = Judge::new(llm, enabled_config());

    let validation = ValidationResult {
        issues: vec![Issue {
            issue_type: "HALLUCINATION".to_string(),
            claim: "claim".to_string(),
            fact: Some("fact".to_string()),
            correction: None,
            severity: "high".to_string(),
        }],
        confidence: 0.6,
        needs_correction: true,
        relevance_score: 1.0,
        completeness_score: 1.0,
    };

    let corrected = judge.correct_response("original answer", &validation, &ContextAnalysis::default()).await;
    assert_eq!(corrected, "corrected answer");
}
