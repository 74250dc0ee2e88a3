use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum RerankError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("reranker unavailable: {reason}")]
    NotAvailable { reason: String },
}

impl SynapseError for RerankError {
    fn kind(&self) -> ErrorKind {
        match self {
            RerankError::Embedding(e) => e.kind(),
            RerankError::InvalidInput { .. } => ErrorKind::BadRequest,
            RerankError::NotAvailable { .. } => ErrorKind::UpstreamUnavailable,
        }
    }
}
