//! Core data model shared across every component.
//!
//! These are the semantic entities the core consumes and produces;
//! persistence itself is a collaborator's concern (see [`crate::persistence`]).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Opaque tenant identifier. All indexes and caches are partitioned by tenant;
/// no operation may surface or mutate data whose tenant id differs from the
/// authenticated caller's.
pub type TenantId = Uuid;

/// A logical index scope within a tenant.
pub type CollectionId = Uuid;

/// `(document_id, chunk_index)` is unique and dense (`0..N`) per document.
pub type DocumentId = Uuid;

/// Ingestion lifecycle state. Transitions are strictly forward; re-processing
/// resets to `Pending` and bumps a retry counter owned by the ingestion
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// Only `completed` documents are searchable.
    pub fn is_searchable(self) -> bool {
        matches!(self, DocumentStatus::Completed)
    }
}

/// `(tenant, collection, document_id, title, filename, content_type, status,
/// document_vector?, summary?)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    pub collection_id: CollectionId,
    pub title: String,
    pub filename: String,
    pub content_type: String,
    pub status: DocumentStatus,
    pub document_vector: Option<Vec<f32>>,
    pub summary: Option<String>,
    /// Ingestion-time domain processor tag, filterable via `document_type`.
    pub domain_processor: Option<String>,
}

/// `(chunk_id, document_id, collection, tenant, chunk_index, content,
/// search_content, vector[D], metadata, chunk_metadata)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: Uuid,
    pub document_id: DocumentId,
    pub collection_id: CollectionId,
    pub tenant_id: TenantId,
    pub chunk_index: i32,
    pub content: String,
    /// Normalized form of `content` used for lexical search.
    pub search_content: String,
    pub vector: Option<Vec<f32>>,
    pub metadata: HashMap<String, String>,
    pub chunk_metadata: HashMap<String, serde_json::Value>,
}

/// Document identity as surfaced on a [`Hit`] or [`SourceReference`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub title: String,
    pub filename: String,
}

/// Fetched neighboring-chunk context around a hit, set by the Context
/// Expander.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextWindow {
    pub original_index: i32,
    pub start_index: i32,
    pub end_index: i32,
    pub chunks_merged: usize,
}

/// Transient retrieval result. Carries everything needed to render a
/// [`SourceReference`] and to feed context assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    pub chunk_id: Uuid,
    pub content: String,
    pub chunk_index: i32,
    pub score: f32,
    pub rerank_score: Option<f32>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub chunk_metadata: HashMap<String, serde_json::Value>,
    pub document: DocumentInfo,
    pub collection_id: CollectionId,
    pub expanded_content: Option<String>,
    pub context_window: Option<ContextWindow>,
}

impl Hit {
    /// `true` if this hit was added by graph enrichment rather than base
    /// search.
    pub fn is_graph_sourced(&self) -> bool {
        matches!(
            self.metadata.get("graph_sourced"),
            Some(serde_json::Value::Bool(true))
        )
    }
}

/// Projection of a [`Hit`] for the response, used before the graph/chunk
/// dedup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub document_id: String,
    pub title: String,
    pub filename: Option<String>,
    pub chunk_index: i32,
    pub score: f32,
}

/// Narrative plus structured hits returned by the graph library.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphContext {
    pub answer: String,
    pub chunks: Vec<GraphChunk>,
    pub references: Vec<GraphReference>,
}

/// A chunk-shaped result surfaced from the graph library, to be fused with
/// base search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphChunk {
    pub chunk_id: String,
    pub content: String,
    pub score: f32,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// An entity/document reference surfaced by the graph library. `reference_id`
/// and `file_path` are both optional — the library does not always populate
/// either.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphReference {
    pub reference_id: Option<String>,
    pub file_path: Option<String>,
    pub content: Option<String>,
}

/// Kind of media surfaced from a source chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Table,
    Figure,
}

/// Image, table, or figure reference extracted from a retrieved chunk,
/// surfaced to the client alongside the chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub source_document_id: DocumentId,
    pub source_document_title: String,
    pub description: Option<String>,
    pub page_number: Option<i64>,
    pub url: Option<String>,
    pub content_preview: Option<String>,
}

/// A suggested next question, with a one-line reason it was suggested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    pub relevance: String,
}

/// `(session_id, tenant, collection?, title, created_at, last_message_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub collection_id: Option<CollectionId>,
    pub title: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_message_at: chrono::DateTime<chrono::Utc>,
}

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// `(role, content, chunk_ids?, metadata?, created_at)`. Messages hold no
/// back-pointer to the session except the id; deleting a session cascades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub chunk_ids: Vec<Uuid>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
