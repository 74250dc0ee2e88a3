//! Request handlers for the retrieval and chat endpoints: raw-`Value`
//! intake validated then lifted into a typed OpenAI request, with the
//! `stream` bool branching into the SSE path vs. a buffered JSON response.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use async_openai::types::chat::CreateChatCompletionRequest;
use synapse_core::chat::{ChatRequest, ReasoningMode};
use synapse_core::config::GenerationPreset;
use synapse_core::persistence::ChunkStore;
use synapse_core::retrieval::{RetrievalRequest, SearchMode};
use synapse_core::search::MetadataFilter;
use synapse_core::types::CollectionId;

use super::adapter::last_user_message_text;
use super::error::GatewayError;
use super::state::HandlerState;

const TENANT_HEADER: &str = "x-tenant-id";

fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Uuid, GatewayError> {
    let raw = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::InvalidRequest(format!("missing `{TENANT_HEADER}` header")))?;
    Uuid::parse_str(raw).map_err(|_| GatewayError::InvalidRequest(format!("`{TENANT_HEADER}` is not a valid uuid")))
}

#[derive(Debug, Deserialize)]
pub struct RetrievalRequestBody {
    pub query: String,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
    pub collection_id: CollectionId,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    pub document_type: Option<String>,
    #[serde(default = "default_true")]
    pub rerank: bool,
    #[serde(default = "default_true")]
    pub enable_graph: bool,
    #[serde(default = "default_true")]
    pub hierarchical: bool,
    #[serde(default = "default_true")]
    pub expand_context: bool,
    pub metadata_filter: Option<MetadataFilter>,
}

fn default_mode() -> SearchMode {
    SearchMode::Hybrid
}

fn default_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[instrument(skip(state, body), fields(tenant_id = tracing::field::Empty))]
pub async fn retrieval_handler<C>(
    State(state): State<HandlerState<C>>,
    headers: HeaderMap,
    Json(body): Json<RetrievalRequestBody>,
) -> Result<Response, GatewayError>
where
    C: ChunkStore + 'static,
{
    let tenant_id = tenant_id_from_headers(&headers)?;
    tracing::Span::current().record("tenant_id", tracing::field::display(&tenant_id));

    let mut request = RetrievalRequest::new(tenant_id, body.collection_id, body.query, body.mode);
    request.top_k = body.top_k;
    request.document_type = body.document_type;
    request.rerank = body.rerank;
    request.enable_graph = body.enable_graph;
    request.hierarchical = body.hierarchical;
    request.expand_context = body.expand_context;
    request.metadata_filter = body.metadata_filter;

    let response = state.retrieval.retrieve(request).await.map_err(GatewayError::from_core)?;
    Ok(Json(response).into_response())
}

/// Synapse-specific fields layered on top of the OpenAI-compatible request
/// shape. Extracted from the raw request body before it is also parsed as
/// [`CreateChatCompletionRequest`], a two-pass approach that validates the
/// legacy fields ahead of the typed parse.
#[derive(Debug, Deserialize, Default)]
pub struct ChatRequestExtras {
    pub session_id: Option<Uuid>,
    pub collection_id: Option<CollectionId>,
    #[serde(default)]
    pub retrieval: RetrievalSettingsBody,
    #[serde(default = "default_preset")]
    pub preset: GenerationPreset,
    #[serde(default)]
    pub reasoning_mode: String,
    pub custom_instruction: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub is_follow_up: bool,
}

fn default_preset() -> GenerationPreset {
    GenerationPreset::Detailed
}

#[derive(Debug, Deserialize, Default)]
pub struct RetrievalSettingsBody {
    pub mode: Option<SearchMode>,
    pub top_k: Option<usize>,
    pub document_type: Option<String>,
    pub rerank: Option<bool>,
    pub enable_graph: Option<bool>,
    pub hierarchical: Option<bool>,
    pub expand_context: Option<bool>,
    pub metadata_filter: Option<MetadataFilter>,
}

#[instrument(skip(state, body), fields(tenant_id = tracing::field::Empty, stream = tracing::field::Empty))]
pub async fn chat_completions_handler<C>(
    State(state): State<HandlerState<C>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, GatewayError>
where
    C: ChunkStore + 'static,
{
    let tenant_id = tenant_id_from_headers(&headers)?;
    tracing::Span::current().record("tenant_id", tracing::field::display(&tenant_id));

    let extras: ChatRequestExtras =
        serde_json::from_value(body.clone()).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

    let openai_request: CreateChatCompletionRequest =
        serde_json::from_value(body).map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

    let message = last_user_message_text(&openai_request.messages)
        .ok_or_else(|| GatewayError::InvalidRequest("messages must include at least one user turn".to_string()))?;

    let mut request = ChatRequest::new(tenant_id, message);
    request.session_id = extras.session_id;
    request.collection_id = extras.collection_id;
    request.preset = extras.preset;
    request.reasoning_mode = if extras.reasoning_mode.eq_ignore_ascii_case("deep") {
        ReasoningMode::Deep
    } else {
        ReasoningMode::Standard
    };
    request.custom_instruction = extras.custom_instruction;
    request.system_prompt_override = extras.system_prompt;
    request.is_follow_up = extras.is_follow_up;

    if let Some(mode) = extras.retrieval.mode {
        request.retrieval.mode = mode;
    }
    if let Some(top_k) = extras.retrieval.top_k {
        request.retrieval.top_k = top_k;
    }
    if extras.retrieval.document_type.is_some() {
        request.retrieval.document_type = extras.retrieval.document_type;
    }
    if let Some(rerank) = extras.retrieval.rerank {
        request.retrieval.rerank = rerank;
    }
    if let Some(enable_graph) = extras.retrieval.enable_graph {
        request.retrieval.enable_graph = enable_graph;
    }
    if let Some(hierarchical) = extras.retrieval.hierarchical {
        request.retrieval.hierarchical = hierarchical;
    }
    if let Some(expand_context) = extras.retrieval.expand_context {
        request.retrieval.expand_context = expand_context;
    }
    if extras.retrieval.metadata_filter.is_some() {
        request.retrieval.metadata_filter = extras.retrieval.metadata_filter;
    }

    let stream_requested = openai_request.stream.unwrap_or(false);
    tracing::Span::current().record("stream", stream_requested);

    if stream_requested {
        let events = state.chat.chat_stream(request);
        return Ok(super::streaming::chat_event_response(events));
    }

    let response = state.chat.chat(request).await.map_err(GatewayError::from_core)?;
    Ok(Json(response_envelope(&response)).into_response())
}

/// Wraps the chat orchestrator's response in an OpenAI-chat-completion-
/// shaped envelope, extended with the synapse-specific fields (`sources`,
/// `media`, `follow_ups`, `usage`, `session_id`, `graph_enhanced`) a plain
/// `CreateChatCompletionResponse` has no room for.
fn response_envelope(response: &synapse_core::chat::ChatResponse) -> serde_json::Value {
    serde_json::json!({
        "id": format!("chatcmpl-{}", response.message_id),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": response.content },
            "finish_reason": "stop",
        }],
        "usage": response.usage,
        "session_id": response.session_id,
        "message_id": response.message_id,
        "graph_enhanced": response.graph_enhanced,
        "sources": response.sources,
        "media": response.media,
        "follow_ups": response.follow_ups,
    })
}
