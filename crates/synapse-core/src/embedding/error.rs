use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

/// One variant per concrete failure mode, each with a `From` conversion for
/// the upstream error type it wraps.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("model not found at {path}")]
    ModelNotFound { path: String },

    #[error("failed to load model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("device unavailable ({device}): {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedder unavailable: {reason}")]
    NotAvailable { reason: String },
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EmbeddingError {
    fn from(err: std::io::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}

impl SynapseError for EmbeddingError {
    fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingError::ModelNotFound { .. } => ErrorKind::Internal,
            EmbeddingError::ModelLoadFailed { .. } => ErrorKind::Internal,
            EmbeddingError::DeviceUnavailable { .. } => ErrorKind::Internal,
            EmbeddingError::TokenizationFailed { .. } => ErrorKind::BadRequest,
            EmbeddingError::InferenceFailed { .. } => ErrorKind::UpstreamUnavailable,
            EmbeddingError::DimensionMismatch { .. } => ErrorKind::Corrupted,
            EmbeddingError::NotAvailable { .. } => ErrorKind::UpstreamUnavailable,
        }
    }
}
