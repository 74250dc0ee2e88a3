//! HTTP/SSE gateway binding `synapse-core`'s retrieval and chat
//! orchestrators to the outside world. This crate owns every
//! `axum`/`async-openai`-shaped detail; nothing under `synapse-core` knows
//! an HTTP request exists.

pub mod gateway;
