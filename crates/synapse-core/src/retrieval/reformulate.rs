//! Query reformulation. Expanding the raw query with synonyms and related
//! terms before embedding tends to help recall on short or jargon-heavy
//! queries; an installation without an LLM configured simply runs with
//! [`NoopQueryReformulator`] and pays no latency for it.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmMessage};

use super::RetrievalError;

#[async_trait]
pub trait QueryReformulator: Send + Sync {
    /// Returns a reformulated query for `strategy` (currently always
    /// `"expand"`). Implementations that cannot improve on the input should
    /// return it unchanged rather than erroring — the orchestrator treats a
    /// reformulation failure as "use the original query", not as a retrieval
    /// failure.
    async fn reformulate(&self, query: &str, strategy: &str) -> Result<String, RetrievalError>;

    fn is_available(&self) -> bool;
}

/// Always returns the query unchanged. The default when no LLM is wired up
/// for reformulation.
#[derive(Debug, Default)]
pub struct NoopQueryReformulator;

#[async_trait]
impl QueryReformulator for NoopQueryReformulator {
    async fn reformulate(&self, query: &str, _strategy: &str) -> Result<String, RetrievalError> {
        Ok(query.to_string())
    }

    fn is_available(&self) -> bool {
        false
    }
}

const EXPAND_SYSTEM_PROMPT: &str = "You rewrite a user's search query to improve retrieval recall. \
Add relevant synonyms and related terms the user likely means, but preserve the original intent. \
Respond with the rewritten query only, no explanation, no quotes.";

/// Expands the query via a single LLM call.
pub struct LlmQueryReformulator {
    llm: Arc<dyn LlmClient>,
}

impl LlmQueryReformulator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QueryReformulator for LlmQueryReformulator {
    #[tracing::instrument(skip(self, query))]
    async fn reformulate(&self, query: &str, strategy: &str) -> Result<String, RetrievalError> {
        let messages = vec![
            LlmMessage::system(EXPAND_SYSTEM_PROMPT),
            LlmMessage::user(format!("Strategy: {strategy}\nQuery: {query}")),
        ];
        let text = self.llm.complete(messages).await?;
        let text = text.trim();
        if text.is_empty() {
            Ok(query.to_string())
        } else {
            Ok(text.to_string())
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;

    #[tokio::test]
    async fn noop_returns_query_unchanged() {
        let reformulator = NoopQueryReformulator;
        assert!(!reformulator.is_available());
        let out = reformulator.reformulate("quarterly revenue", "expand").await.unwrap();
        assert_eq!(out, "quarterly revenue");
    }

    #[tokio::test]
    async fn llm_reformulator_returns_the_trimmed_completion() {
        let llm = Arc::new(MockLlmClient::new(vec!["  quarterly revenue earnings  "]));
        let reformulator = LlmQueryReformulator::new(llm);
        assert!(reformulator.is_available());
        let out = reformulator.reformulate("revenue", "expand").await.unwrap();
        assert_eq!(out, "quarterly revenue earnings");
    }

    #[tokio::test]
    async fn llm_reformulator_falls_back_to_original_on_empty_completion() {
        let llm = Arc::new(MockLlmClient::new(vec![""]));
        let reformulator = LlmQueryReformulator::new(llm);
        let out = reformulator.reformulate("revenue", "expand").await.unwrap();
        assert_eq!(out, "revenue");
    }
}
