use thiserror::Error;

use crate::context::ContextError;
use crate::error::{ErrorKind, SynapseError};
use crate::llm::LlmError;
use crate::persistence::PersistenceError;
use crate::reasoning::ReasoningError;
use crate::retrieval::RetrievalError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Reasoning(#[from] ReasoningError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// Surfaced by the non-streaming [`crate::chat::ChatOrchestrator::chat`]
    /// wrapper when the underlying stream emits a terminal
    /// [`crate::chat::ChatEvent::Error`] or ends without the `usage`/`done`
    /// events a well-formed run always produces.
    #[error("chat stream error: {0}")]
    Stream(String),
}

impl SynapseError for ChatError {
    fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Retrieval(e) => e.kind(),
            ChatError::Reasoning(e) => e.kind(),
            ChatError::Llm(e) => e.kind(),
            ChatError::Persistence(e) => e.kind(),
            ChatError::Context(e) => e.kind(),
            ChatError::Stream(_) => ErrorKind::Internal,
        }
    }
}
