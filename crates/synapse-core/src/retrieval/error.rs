use thiserror::Error;

use crate::context::ContextError;
use crate::embedding::EmbeddingError;
use crate::error::{ErrorKind, SynapseError};
use crate::graph::GraphError;
use crate::llm::LlmError;
use crate::scoring::RerankError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("{0}")]
    Validation(String),

    #[error("graph retrieval was requested but the graph subsystem is disabled")]
    GraphDisabled,

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Rerank(#[from] RerankError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl SynapseError for RetrievalError {
    fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::Validation(_) => ErrorKind::BadRequest,
            RetrievalError::GraphDisabled => ErrorKind::BadRequest,
            RetrievalError::Search(e) => e.kind(),
            RetrievalError::Embedding(e) => e.kind(),
            RetrievalError::Rerank(e) => e.kind(),
            RetrievalError::Graph(e) => e.kind(),
            RetrievalError::Context(e) => e.kind(),
            RetrievalError::Llm(e) => e.kind(),
        }
    }
}
