use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector search failed: {reason}")]
    VectorSearchFailed { reason: String },

    #[error("keyword search failed: {reason}")]
    KeywordSearchFailed { reason: String },

    #[error("metadata filter key {key:?} is not in the allowed set")]
    DisallowedFilterKey { key: String },

    #[error("metadata filter has {count} keys, more than the maximum of {max}")]
    TooManyFilterKeys { count: usize, max: usize },

    #[error("metadata filter value for {key:?} exceeds {max} characters")]
    FilterValueTooLong { key: String, max: usize },
}

impl SynapseError for SearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            SearchError::VectorSearchFailed { .. } => ErrorKind::UpstreamUnavailable,
            SearchError::KeywordSearchFailed { .. } => ErrorKind::UpstreamUnavailable,
            SearchError::DisallowedFilterKey { .. }
            | SearchError::TooManyFilterKeys { .. }
            | SearchError::FilterValueTooLong { .. } => ErrorKind::BadRequest,
        }
    }
}
