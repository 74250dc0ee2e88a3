//! Cross-cutting error classification.
//!
//! Individual modules define their own `thiserror` error enums for their own
//! failure modes (`CacheError`, `EmbeddingError`, `SearchError`, …). Each one
//! implements [`SynapseError::kind`] so a caller at the edge (the gateway)
//! can translate any module error into an HTTP-shaped response without
//! matching on every concrete error type.

use thiserror::Error;

/// Error taxonomy by *kind*, not by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    QuotaExceeded,
    UpstreamUnavailable,
    UpstreamTimeout,
    Corrupted,
    Internal,
}

impl ErrorKind {
    /// Whether an upstream call failing with this kind should be retried
    /// (see [`crate::retry`]).
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::UpstreamUnavailable | ErrorKind::UpstreamTimeout
        )
    }
}

/// Implemented by every module-level error enum so callers can classify an
/// error without downcasting.
pub trait SynapseError: std::error::Error {
    fn kind(&self) -> ErrorKind;
}

/// Top-level error type for operations that can fail across more than one
/// module (the Retrieval Orchestrator, the Chat Orchestrator). Wraps a boxed
/// source while preserving the classification.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    pub fn upstream_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTimeout, message)
    }
}

impl SynapseError for CoreError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}
