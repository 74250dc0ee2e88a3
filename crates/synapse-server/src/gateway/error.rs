//! Maps any [`SynapseError`]-classified failure to an HTTP response, keyed
//! off `synapse-core`'s `ErrorKind` taxonomy rather than one status per
//! concrete error type, since every module error already classifies itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use synapse_core::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Core { kind: ErrorKind, message: String },
}

impl GatewayError {
    pub fn from_core<E: SynapseError>(err: E) -> Self {
        GatewayError::Core {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
    code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Core { kind, message } => (status_for_kind(*kind), message.clone()),
        };

        let body = Json(ErrorBody {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Corrupted => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
