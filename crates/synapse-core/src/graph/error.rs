use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph library failed to initialize: {reason}")]
    InitFailed { reason: String },

    #[error("insert failed: {reason}")]
    InsertFailed { reason: String },

    #[error("query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("failed to create working directory {path}: {source}")]
    WorkingDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SynapseError for GraphError {
    fn kind(&self) -> ErrorKind {
        match self {
            GraphError::InitFailed { .. } => ErrorKind::Internal,
            GraphError::InsertFailed { .. } => ErrorKind::UpstreamUnavailable,
            GraphError::QueryFailed { .. } => ErrorKind::UpstreamUnavailable,
            GraphError::WorkingDir { .. } => ErrorKind::Internal,
        }
    }
}
