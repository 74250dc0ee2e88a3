//! HTTP gateway layer: `/healthz`, `/ready`, and the retrieval/chat POST
//! routes, wrapped in a `TraceLayer`.

mod adapter;
pub mod error;
mod handler;
pub mod state;
mod streaming;

pub use handler::{chat_completions_handler, retrieval_handler};
pub use state::HandlerState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum::extract::State;
use tower_http::trace::TraceLayer;

use synapse_core::persistence::ChunkStore;

pub fn create_router_with_state<C>(state: HandlerState<C>) -> Router
where
    C: ChunkStore + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<C>))
        .route("/v1/retrievals", post(retrieval_handler::<C>))
        .route("/v1/chat/completions", post(chat_completions_handler::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health_handler() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

#[derive(serde::Serialize)]
struct ReadyResponse {
    status: &'static str,
    graph_enabled: bool,
}

/// Reports ready once constructed — every collaborator this gateway holds
/// is built eagerly in `main` before the listener binds, so there is no
/// lazy-init window where `/ready` would need to poll anything.
async fn ready_handler<C>(State(state): State<HandlerState<C>>) -> Response
where
    C: ChunkStore + 'static,
{
    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ok",
            graph_enabled: state.config.graph.enabled,
        }),
    )
        .into_response()
}
