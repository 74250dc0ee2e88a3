use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use genai::Client;
use genai::chat::{ChatMessage as GenaiMessage, ChatRequest, ChatStreamEvent};

use super::{LlmClient, LlmDelta, LlmError, LlmMessage};
use crate::config::LlmConfig;
use crate::types::MessageRole;

/// Wraps `genai::Client` the way the gateway wraps it for streaming
/// completions, adding the timeout/model bookkeeping every caller would
/// otherwise duplicate.
pub struct GenaiLlmClient {
    client: Client,
    model: String,
    timeout: Duration,
}

impl GenaiLlmClient {
    pub fn new(client: Client, config: &LlmConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }

    fn to_request(messages: Vec<LlmMessage>) -> ChatRequest {
        let genai_messages = messages
            .into_iter()
            .map(|m| match m.role {
                MessageRole::System => GenaiMessage::system(m.content),
                MessageRole::User => GenaiMessage::user(m.content),
                MessageRole::Assistant => GenaiMessage::assistant(m.content),
            })
            .collect::<Vec<_>>();
        ChatRequest::new(genai_messages)
    }
}

#[async_trait]
impl LlmClient for GenaiLlmClient {
    #[tracing::instrument(skip(self, messages))]
    async fn complete(&self, messages: Vec<LlmMessage>) -> Result<String, LlmError> {
        let request = Self::to_request(messages);
        let response = tokio::time::timeout(self.timeout, self.client.exec_chat(&self.model, request, None))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        response
            .first_text()
            .map(|s| s.to_string())
            .ok_or_else(|| LlmError::Malformed("provider returned no text content".to_string()))
    }

    #[tracing::instrument(skip(self, messages))]
    async fn stream(&self, messages: Vec<LlmMessage>) -> Result<BoxStream<'static, Result<LlmDelta, LlmError>>, LlmError> {
        let request = Self::to_request(messages);
        let chat_stream_resp = self
            .client
            .exec_chat_stream(&self.model, request, None)
            .await
            .map_err(|e| LlmError::Provider(e.to_string()))?;

        let stream = chat_stream_resp.stream.filter_map(|event| async move {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) if !chunk.content.is_empty() => {
                    Some(Ok(LlmDelta { content: chunk.content }))
                }
                Ok(_) => None,
                Err(e) => Some(Err(LlmError::Provider(e.to_string()))),
            }
        });

        Ok(Box::pin(stream))
    }
}
