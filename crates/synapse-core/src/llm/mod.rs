//! LLM provider abstraction shared by the reasoning, judge, follow-up, and
//! chat components. Transport stays generic over [`genai::Client`] the same
//! way the gateway's streaming handler does (see `gateway::streaming` in
//! `synapse-server`), but every caller here goes through [`LlmClient`] so
//! tests can substitute [`mock::MockLlmClient`] instead of a live provider.

mod error;
pub mod genai_client;
pub mod mock;
#[cfg(test)]
mod tests;

pub use error::LlmError;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::types::MessageRole;

#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A single streamed text fragment. The orchestrator decides how to further
/// chunk/forward these; this type carries no transport framing.
#[derive(Debug, Clone)]
pub struct LlmDelta {
    pub content: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-shot completion used by components that need the whole
    /// response before proceeding (reasoning decomposition/synthesis, judge
    /// stages, follow-up generation).
    async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, LlmError>;

    /// Token-by-token completion used by the chat orchestrator to forward
    /// deltas to the client as they arrive.
    async fn stream(&self, messages: Vec<LlmMessage>) -> Result<BoxStream<'static, Result<LlmDelta, LlmError>>, LlmError>;
}
