use std::net::AddrParseError;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::{ErrorKind, SynapseError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port: {value}")]
    InvalidPort { value: String },

    #[error("failed to parse port {value:?}")]
    PortParseError {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid bind address {value:?}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("missing required environment variable {name}")]
    MissingEnvVar { name: String },

    #[error("path does not exist: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },
}

impl SynapseError for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::BadRequest
    }
}
