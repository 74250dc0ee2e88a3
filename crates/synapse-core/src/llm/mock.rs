use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};

use super::{LlmClient, LlmDelta, LlmError, LlmMessage};

/// Returns pre-programmed responses in order, for exercising reasoning,
/// judge, and follow-up flows without a live provider. Each call to
/// `complete`/`stream` pops the next queued response; panics if the queue is
/// exhausted, since a test that needs more responses than it queued has a
/// bug in its expectations.
pub struct MockLlmClient {
    responses: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).rev().collect()),
        }
    }

    fn next_response(&self) -> String {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .expect("MockLlmClient queue exhausted")
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: Vec<LlmMessage>) -> Result<String, LlmError> {
        Ok(self.next_response())
    }

    async fn stream(&self, _messages: Vec<LlmMessage>) -> Result<BoxStream<'static, Result<LlmDelta, LlmError>>, LlmError> {
        let text = self.next_response();
        let deltas = text
            .split_whitespace()
            .map(|word| Ok(LlmDelta { content: format!("{word} ") }))
            .collect::<Vec<_>>();
        Ok(stream::iter(deltas).boxed())
    }
}
