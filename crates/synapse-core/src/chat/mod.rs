//! Chat Orchestrator: the streaming state machine that ties retrieval, LLM
//! generation, judge validation/correction, and follow-up generation
//! together and emits the `ChatEvent` SSE vocabulary.
//!
//! The orchestrator never runs directly on the caller's task: [`Self::chat_stream`]
//! spawns the state machine onto its own task and returns a
//! [`tokio_stream::wrappers::UnboundedReceiverStream`] immediately, so a
//! client that disconnects (drops the receiver) simply makes every
//! subsequent `tx.send` fail, and the state machine aborts without
//! persisting the in-progress assistant message.

pub mod prompt;
pub mod sources;

mod error;

pub use error::ChatError;

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::config::{Config, GenerationPreset};
use crate::context::ContextExpander;
use crate::followup::FollowUpService;
use crate::judge::Judge;
use crate::llm::{LlmClient, LlmMessage};
use crate::persistence::{ChunkStore, MessageStore, SessionStore};
use crate::reasoning::{DeepReasoner, ReasoningEvent};
use crate::retrieval::{RetrievalOrchestrator, RetrievalRequest, SearchMode};
use crate::search::MetadataFilter;
use crate::types::{
    ChatMessage, ChatSession, CollectionId, FollowUpQuestion, Hit, MediaItem, MessageRole, SourceReference, TenantId,
};

/// `standard` runs the single-pass Retrieval Orchestrator; `deep`
/// decomposes the query first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningMode {
    Standard,
    Deep,
}

/// The subset of `RetrievalConfig` the Chat Orchestrator threads through to
/// the Retrieval Orchestrator, minus `tenant_id`/`collection_id`/`query`,
/// which come from the surrounding [`ChatRequest`].
#[derive(Debug, Clone)]
pub struct ChatRetrievalSettings {
    pub mode: SearchMode,
    pub top_k: usize,
    pub document_type: Option<String>,
    pub rerank: bool,
    pub enable_graph: bool,
    pub hierarchical: bool,
    pub expand_context: bool,
    pub metadata_filter: Option<MetadataFilter>,
}

impl Default for ChatRetrievalSettings {
    fn default() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            top_k: 10,
            document_type: None,
            rerank: true,
            enable_graph: true,
            hierarchical: true,
            expand_context: true,
            metadata_filter: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub tenant_id: TenantId,
    pub session_id: Option<Uuid>,
    pub collection_id: Option<CollectionId>,
    pub message: String,
    pub retrieval: ChatRetrievalSettings,
    pub preset: GenerationPreset,
    pub reasoning_mode: ReasoningMode,
    /// When set, overrides the preset-built system prompt verbatim; the
    /// retrieved context then rides in the first user message instead.
    pub system_prompt_override: Option<String>,
    pub custom_instruction: Option<String>,
    pub is_follow_up: bool,
}

impl ChatRequest {
    pub fn new(tenant_id: TenantId, message: impl Into<String>) -> Self {
        Self {
            tenant_id,
            session_id: None,
            collection_id: None,
            message: message.into(),
            retrieval: ChatRetrievalSettings::default(),
            preset: GenerationPreset::Detailed,
            reasoning_mode: ReasoningMode::Standard,
            system_prompt_override: None,
            custom_instruction: None,
            is_follow_up: false,
        }
    }
}

/// `usage = {prompt, completion, total, retrieval}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub retrieval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoneMetadata {
    pub session_id: Uuid,
    pub message_id: Uuid,
    pub graph_enhanced: bool,
}

/// The SSE event vocabulary: `reasoning_step`, `sub_query`, `sources`,
/// `media`, `delta`, `follow_up`, `usage`, `done`, `error`. A well-formed
/// stream always ends in `Done` or `Error`; consumers must tolerate zero
/// `Delta`s and still receive `Sources` (possibly empty), `Usage`, and a
/// terminal event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ReasoningStep { step: u8, message: String },
    SubQuery { query: String },
    Sources { sources: Vec<SourceReference> },
    Media { items: Vec<MediaItem> },
    Delta { content: String },
    FollowUp { question: FollowUpQuestion },
    Usage { usage: Usage },
    Done { metadata: DoneMetadata },
    Error { message: String },
}

/// Aggregated result for non-streaming callers: one response carrying the
/// same sub-structures a streamed call would have emitted as events.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub sources: Vec<SourceReference>,
    pub media: Vec<MediaItem>,
    pub follow_ups: Vec<FollowUpQuestion>,
    pub usage: Usage,
    pub session_id: Uuid,
    pub message_id: Uuid,
    pub graph_enhanced: bool,
}

/// Outcome of the retrieval step, normalized across the standard and deep
/// paths so the rest of the state machine doesn't need to branch on
/// `reasoning_mode` again.
struct RetrievedContext {
    hits: Vec<Hit>,
    graph_enhanced: bool,
    graph_context: Option<String>,
    graph_references: Vec<crate::types::GraphReference>,
    retrieval_latency_ms: u64,
}

pub struct ChatOrchestrator<C: ChunkStore> {
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    retrieval: Arc<RetrievalOrchestrator<C>>,
    deep_reasoner: Arc<DeepReasoner<RetrievalOrchestrator<C>>>,
    context_expander: Arc<ContextExpander<C>>,
    judge: Arc<Judge>,
    followup: Arc<FollowUpService>,
    llm: Arc<dyn LlmClient>,
    config: Arc<Config>,
}

impl<C: ChunkStore + 'static> Clone for ChatOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            messages: self.messages.clone(),
            retrieval: self.retrieval.clone(),
            deep_reasoner: self.deep_reasoner.clone(),
            context_expander: self.context_expander.clone(),
            judge: self.judge.clone(),
            followup: self.followup.clone(),
            llm: self.llm.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: ChunkStore + 'static> ChatOrchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        retrieval: Arc<RetrievalOrchestrator<C>>,
        deep_reasoner: Arc<DeepReasoner<RetrievalOrchestrator<C>>>,
        context_expander: Arc<ContextExpander<C>>,
        judge: Arc<Judge>,
        followup: Arc<FollowUpService>,
        llm: Arc<dyn LlmClient>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            sessions,
            messages,
            retrieval,
            deep_reasoner,
            context_expander,
            judge,
            followup,
            llm,
            config,
        }
    }

    /// Runs the full state machine on its own task and returns a stream of
    /// [`ChatEvent`]s as they're produced. Dropping the returned stream
    /// (client disconnect) causes the background task's next `send` to
    /// fail, at which point it stops without persisting the assistant
    /// message.
    pub fn chat_stream(&self, request: ChatRequest) -> UnboundedReceiverStream<ChatEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let this = self.clone();
        tokio::spawn(async move {
            this.run(request, tx).await;
        });
        UnboundedReceiverStream::new(rx)
    }

    /// Non-streaming wrapper: drains [`Self::chat_stream`] into one
    /// aggregated [`ChatResponse`]. A terminal `Error` event or a stream
    /// that ends without `Done` both surface as [`ChatError::Stream`].
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let mut stream = self.chat_stream(request);
        let mut content = String::new();
        let mut sources = Vec::new();
        let mut media = Vec::new();
        let mut follow_ups = Vec::new();
        let mut usage = None;
        let mut done = None;

        while let Some(event) = stream.next().await {
            match event {
                ChatEvent::Sources { sources: s } => sources = s,
                ChatEvent::Media { items } => media = items,
                ChatEvent::Delta { content: delta } => content.push_str(&delta),
                ChatEvent::FollowUp { question } => follow_ups.push(question),
                ChatEvent::Usage { usage: u } => usage = Some(u),
                ChatEvent::Done { metadata } => {
                    done = Some(metadata);
                    break;
                }
                ChatEvent::Error { message } => return Err(ChatError::Stream(message)),
                ChatEvent::ReasoningStep { .. } | ChatEvent::SubQuery { .. } => {}
            }
        }

        let done = done.ok_or_else(|| ChatError::Stream("stream ended without a done event".to_string()))?;
        let usage = usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            retrieval_ms: 0,
        });

        Ok(ChatResponse {
            content,
            sources,
            media,
            follow_ups,
            usage,
            session_id: done.session_id,
            message_id: done.message_id,
            graph_enhanced: done.graph_enhanced,
        })
    }

    async fn run(&self, request: ChatRequest, tx: UnboundedSender<ChatEvent>) {
        if let Err(err) = self.run_inner(request, &tx).await {
            let _ = tx.send(ChatEvent::Error { message: err.to_string() });
        }
    }

    #[tracing::instrument(skip(self, request, tx), fields(tenant_id = %request.tenant_id))]
    async fn run_inner(&self, request: ChatRequest, tx: &UnboundedSender<ChatEvent>) -> Result<(), ChatError> {
        let session = self
            .load_or_create_session(request.tenant_id, request.session_id, request.collection_id)
            .await?;

        // Loaded before the current turn is appended, so it never contains
        // the message we're about to answer (prompt::build_messages appends
        // the current turn itself).
        let history = self.messages.list(session.id).await?;

        let user_message = ChatMessage {
            id: Uuid::new_v4(),
            session_id: session.id,
            role: MessageRole::User,
            content: request.message.clone(),
            chunk_ids: Vec::new(),
            metadata: HashMap::new(),
            created_at: chrono::Utc::now(),
        };
        self.messages.append(user_message).await?;

        let retrieved = match request.reasoning_mode {
            ReasoningMode::Standard => self.retrieve_standard(&request).await?,
            ReasoningMode::Deep => self.retrieve_deep(&request, tx).await?,
        };

        let chunk_source_refs = sources::hits_to_source_references(&retrieved.hits);
        let graph_source_refs = sources::graph_references_to_source_references(&retrieved.graph_references);
        let source_refs = sources::deduplicate_sources(chunk_source_refs, graph_source_refs);
        if tx.send(ChatEvent::Sources { sources: source_refs.clone() }).is_err() {
            return Ok(());
        }

        let media_items = self.followup.extract_media(&retrieved.hits);
        if tx
            .send(ChatEvent::Media { items: media_items.clone() })
            .is_err()
        {
            return Ok(());
        }

        // Pre-analysis runs concurrently with LLM streaming below, not
        // sequentially after it.
        let judge = self.judge.clone();
        let pre_analysis_hits = retrieved.hits.clone();
        let pre_analysis_query = request.message.clone();
        let judge_task = tokio::spawn(async move { judge.pre_analyze_context(&pre_analysis_hits, &pre_analysis_query).await });

        let context = prompt::build_context(&retrieved.hits, retrieved.graph_context.as_deref());
        let previous_context = request.is_follow_up.then(|| prompt::extract_previous_context(&history)).flatten();

        let (system_prompt, context_for_message) = match &request.system_prompt_override {
            Some(override_prompt) => {
                let mut carried = context.clone();
                if let Some(previous_context) = &previous_context {
                    carried.push_str(&format!("\n\nPREVIOUS EXCHANGE:\n{previous_context}"));
                }
                (override_prompt.clone(), carried)
            }
            None => {
                let system_prompt = prompt::build_system_prompt(
                    request.preset,
                    &context,
                    request.custom_instruction.as_deref(),
                    previous_context.as_deref(),
                );
                (system_prompt, String::new())
            }
        };

        let llm_messages = prompt::build_messages(&history, &request.message, &context_for_message, &system_prompt);
        let prompt_text: String = llm_messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");

        let full_response = match self.stream_llm(llm_messages, tx).await? {
            Some(text) => text,
            None => return Ok(()), // client disconnected mid-stream
        };

        let analysis = judge_task.await.unwrap_or_else(|_| crate::judge::ContextAnalysis {
            query: request.message.clone(),
            ..Default::default()
        });
        let validation = self.judge.validate_response(&full_response, &analysis, &request.message).await;

        let mut final_response = full_response.clone();
        if validation.needs_correction {
            let corrected = self.judge.correct_response(&full_response, &validation, &analysis).await;
            if corrected != full_response {
                final_response = corrected.clone();
                let correction_delta = format!("\n\n---\n[Correction Applied]\n{corrected}");
                if tx.send(ChatEvent::Delta { content: correction_delta }).is_err() {
                    return Ok(());
                }
            }
        }

        let follow_ups = self
            .followup
            .generate_follow_ups(&request.message, &final_response, &retrieved.hits, Some(media_items))
            .await;
        for question in &follow_ups {
            if tx.send(ChatEvent::FollowUp { question: question.clone() }).is_err() {
                return Ok(());
            }
        }

        let message_id = Uuid::new_v4();
        let mut metadata = HashMap::new();
        metadata.insert("graph_enhanced".to_string(), serde_json::Value::Bool(retrieved.graph_enhanced));
        let chunk_ids: Vec<Uuid> = retrieved.hits.iter().map(|h| h.chunk_id).collect();
        let assistant_message = ChatMessage {
            id: message_id,
            session_id: session.id,
            role: MessageRole::Assistant,
            content: final_response.clone(),
            chunk_ids,
            metadata,
            created_at: chrono::Utc::now(),
        };

        // A persistence failure here must not re-emit content or fail the
        // stream — log it and still proceed to `done`.
        if let Err(err) = self.messages.append(assistant_message).await {
            tracing::error!(error = %err, "failed to persist assistant message");
        } else if let Err(err) = self.sessions.touch(request.tenant_id, session.id).await {
            tracing::error!(error = %err, "failed to update session timestamp");
        }

        let prompt_tokens = prompt::estimate_tokens(&prompt_text);
        let completion_tokens = prompt::estimate_tokens(&final_response);
        let usage = Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            retrieval_ms: retrieved.retrieval_latency_ms,
        };
        if tx.send(ChatEvent::Usage { usage }).is_err() {
            return Ok(());
        }

        let _ = tx.send(ChatEvent::Done {
            metadata: DoneMetadata {
                session_id: session.id,
                message_id,
                graph_enhanced: retrieved.graph_enhanced,
            },
        });

        Ok(())
    }

    async fn load_or_create_session(
        &self,
        tenant_id: TenantId,
        session_id: Option<Uuid>,
        collection_id: Option<CollectionId>,
    ) -> Result<ChatSession, ChatError> {
        if let Some(id) = session_id
            && let Some(session) = self.sessions.get(tenant_id, id).await?
        {
            return Ok(session);
        }

        let now = chrono::Utc::now();
        let session = ChatSession {
            id: session_id.unwrap_or_else(Uuid::new_v4),
            tenant_id,
            collection_id,
            title: None,
            created_at: now,
            last_message_at: now,
        };
        Ok(self.sessions.create(session).await?)
    }

    async fn retrieve_standard(&self, request: &ChatRequest) -> Result<RetrievedContext, ChatError> {
        let collection_id = request.collection_id.unwrap_or_default();
        let retrieval_request = RetrievalRequest {
            tenant_id: request.tenant_id,
            collection_id,
            query: request.message.clone(),
            mode: request.retrieval.mode,
            top_k: request.retrieval.top_k,
            document_type: request.retrieval.document_type.clone(),
            rerank: request.retrieval.rerank,
            enable_graph: request.retrieval.enable_graph,
            hierarchical: request.retrieval.hierarchical,
            expand_context: request.retrieval.expand_context,
            metadata_filter: request.retrieval.metadata_filter.clone(),
        };
        let response = self.retrieval.retrieve(retrieval_request).await?;
        Ok(RetrievedContext {
            hits: response.results,
            graph_enhanced: response.graph_enhanced,
            graph_context: response.graph_context,
            graph_references: response.graph_references,
            retrieval_latency_ms: response.retrieval_latency_ms,
        })
    }

    /// Deep reasoning path: decompose, retrieve per sub-query
    /// (forwarding `reasoning_step`/`sub_query` events as they happen),
    /// synthesize, then expand context over the merged set exactly once —
    /// the sub-query retrievals themselves run with `expand_context: false`
    /// (see the `SubQueryRetriever` impl in `crate::retrieval`) specifically
    /// to avoid expanding chunks that get deduplicated away during merge.
    async fn retrieve_deep(&self, request: &ChatRequest, tx: &UnboundedSender<ChatEvent>) -> Result<RetrievedContext, ChatError> {
        let start = std::time::Instant::now();
        let collection_id = request.collection_id.unwrap_or_default();
        let (reason_tx, mut reason_rx) = tokio::sync::mpsc::unbounded_channel();

        let reasoner = self.deep_reasoner.clone();
        let query = request.message.clone();
        let top_k = request.retrieval.top_k;
        let tenant_id = request.tenant_id;
        let reason_task = tokio::spawn(async move { reasoner.reason(tenant_id, collection_id, &query, top_k, &reason_tx).await });

        while let Some(event) = reason_rx.recv().await {
            let forwarded = match event {
                ReasoningEvent::Step { step, message } => ChatEvent::ReasoningStep { step, message },
                ReasoningEvent::SubQuery { query } => ChatEvent::SubQuery { query },
            };
            if tx.send(forwarded).is_err() {
                reason_task.abort();
                return Err(ChatError::Stream("client disconnected during deep reasoning".to_string()));
            }
        }

        let outcome = reason_task
            .await
            .map_err(|err| ChatError::Stream(format!("deep reasoning task panicked: {err}")))??;

        let hits = if request.retrieval.expand_context {
            self.context_expander.expand(outcome.hits).await?
        } else {
            outcome.hits
        };

        Ok(RetrievedContext {
            hits,
            graph_enhanced: false,
            graph_context: None,
            graph_references: Vec::new(),
            retrieval_latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Streams the LLM response, forwarding each delta as a [`ChatEvent::Delta`].
    /// Returns `Ok(None)` if the client disconnected mid-stream (the caller
    /// should stop without persisting anything further), or propagates a
    /// terminal stream error as [`ChatError::Llm`] after emitting it.
    async fn stream_llm(&self, messages: Vec<LlmMessage>, tx: &UnboundedSender<ChatEvent>) -> Result<Option<String>, ChatError> {
        let mut stream = self.llm.stream(messages).await?;
        let mut full_response = String::new();

        while let Some(delta) = stream.next().await {
            match delta {
                Ok(delta) => {
                    full_response.push_str(&delta.content);
                    if tx.send(ChatEvent::Delta { content: delta.content }).is_err() {
                        return Ok(None);
                    }
                }
                Err(err) => {
                    // A stream error mid-flight terminates the stream; the
                    // tokens already emitted remain with the client, but the
                    // message is not persisted.
                    return Err(ChatError::Llm(err));
                }
            }
        }

        Ok(Some(full_response))
    }
}
