//! Synapse core: multi-tenant retrieval-augmented generation domain logic.
//!
//! This crate owns every component in the retrieval and generation path
//! except HTTP/SSE transport, which lives in `synapse-server`. Persistence,
//! the vector/graph stores, and the LLM provider are collaborators reached
//! through traits defined here.

pub mod error;
pub mod hashing;
pub mod retry;
pub mod types;

pub mod config;
pub mod persistence;

pub mod cache;
pub mod embedding;
pub mod llm;
pub mod scoring;

pub mod search;
pub mod hierarchical;

pub mod graph;
pub mod context;
pub mod reasoning;

pub mod judge;
pub mod followup;

pub mod chat;
pub mod retrieval;

pub use error::{CoreError, ErrorKind, SynapseError};
