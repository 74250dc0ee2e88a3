//! Deep reasoning: query decomposition, iterative sub-query retrieval, and
//! synthesis for questions the standard single-pass pipeline answers poorly.

mod error;
#[cfg(test)]
mod tests;

pub use error::ReasoningError;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::DeepReasoningConfig;
use crate::llm::{LlmClient, LlmMessage};
use crate::types::{CollectionId, Hit, TenantId};

/// Retrieves hits for a single sub-query. Implemented by whatever performs
/// single-pass retrieval (hybrid or hierarchical search over an embedded
/// query) — the Retrieval Orchestrator supplies the concrete instance so
/// this module stays agnostic of embedding/vector-store specifics.
#[async_trait]
pub trait SubQueryRetriever: Send + Sync {
    async fn retrieve(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Hit>, ReasoningError>;
}

/// Emitted as reasoning progresses so the chat orchestrator can forward
/// them to the client as streaming events.
#[derive(Debug, Clone)]
pub enum ReasoningEvent {
    /// `step` is 1 (decomposing), 2 (retrieving), or 3 (synthesizing).
    Step { step: u8, message: String },
    SubQuery { query: String },
}

#[derive(Debug, Clone)]
pub struct ReasoningOutcome {
    pub sub_queries: Vec<String>,
    pub hits: Vec<Hit>,
}

pub struct DeepReasoner<R: SubQueryRetriever> {
    retriever: Arc<R>,
    llm: Arc<dyn LlmClient>,
    config: DeepReasoningConfig,
}

const DECOMPOSE_SYSTEM_PROMPT: &str = "You break a user's question into 2-3 focused sub-questions \
that together cover what is needed to answer it fully. Respond with one sub-question per line, \
each starting with \"- \". Do not repeat the original question.";

impl<R: SubQueryRetriever> DeepReasoner<R> {
    pub fn new(retriever: Arc<R>, llm: Arc<dyn LlmClient>, config: DeepReasoningConfig) -> Self {
        Self { retriever, llm, config }
    }

    /// Splits `query` into up to `max_sub_queries` sub-queries. The original
    /// query is always present at index 0; on any decomposition failure
    /// (LLM error or an empty parse) falls back to `[query]` alone.
    #[tracing::instrument(skip(self))]
    pub async fn decompose(&self, query: &str) -> Vec<String> {
        let messages = vec![
            LlmMessage::system(DECOMPOSE_SYSTEM_PROMPT),
            LlmMessage::user(query),
        ];

        let response = match self.llm.complete(messages).await {
            Ok(text) => text,
            Err(_) => return vec![query.to_string()],
        };

        let mut sub_queries = vec![query.to_string()];
        for line in response.lines() {
            let trimmed = line.trim().trim_start_matches(['-', '*']).trim();
            let trimmed = trim_leading_ordinal(trimmed);
            if trimmed.is_empty() || sub_queries.len() >= self.config.max_sub_queries {
                continue;
            }
            sub_queries.push(trimmed.to_string());
        }

        if sub_queries.len() == 1 {
            return vec![query.to_string()];
        }
        sub_queries
    }

    /// Retrieves `top_k_per_sub` hits for every sub-query and merges them,
    /// keeping only the first occurrence of each chunk id.
    #[tracing::instrument(skip(self, sub_queries))]
    pub async fn retrieve_all(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        sub_queries: &[String],
    ) -> Result<Vec<Hit>, ReasoningError> {
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut merged = Vec::new();
        for sub_query in sub_queries {
            let hits = self
                .retriever
                .retrieve(tenant_id, collection_id, sub_query, self.config.top_k_per_sub)
                .await?;
            for hit in hits {
                if seen.insert(hit.chunk_id) {
                    merged.push(hit);
                }
            }
        }
        Ok(merged)
    }

    /// Sorts merged hits by score descending and truncates to `2 * top_k`.
    pub fn synthesize(&self, mut hits: Vec<Hit>, top_k: usize) -> Vec<Hit> {
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k * 2);
        hits
    }

    /// Runs the full decompose -> retrieve -> synthesize flow, emitting
    /// progress events through `events` as each stage starts.
    #[tracing::instrument(skip(self, events))]
    pub async fn reason(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
        query: &str,
        top_k: usize,
        events: &tokio::sync::mpsc::UnboundedSender<ReasoningEvent>,
    ) -> Result<ReasoningOutcome, ReasoningError> {
        let _ = events.send(ReasoningEvent::Step {
            step: 1,
            message: "Decomposing the question into sub-questions".to_string(),
        });
        let sub_queries = self.decompose(query).await;
        for sub_query in sub_queries.iter().skip(1) {
            let _ = events.send(ReasoningEvent::SubQuery { query: sub_query.clone() });
        }

        let _ = events.send(ReasoningEvent::Step {
            step: 2,
            message: "Retrieving evidence for each sub-question".to_string(),
        });
        let merged = self.retrieve_all(tenant_id, collection_id, &sub_queries).await?;

        let _ = events.send(ReasoningEvent::Step {
            step: 3,
            message: "Synthesizing the combined evidence".to_string(),
        });
        let hits = self.synthesize(merged, top_k);

        Ok(ReasoningOutcome { sub_queries, hits })
    }
}

fn trim_leading_ordinal(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &s[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    s
}
