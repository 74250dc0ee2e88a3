//! Persistence contracts. The durable store (Postgres, or whatever the
//! deployment chooses) is a collaborator — this crate only defines the
//! traits an orchestrator depends on, plus in-memory mocks for tests and the
//! `mock` feature's demo wiring.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::PersistenceError;

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{ChatMessage, ChatSession, Chunk, CollectionId, Document, DocumentId, TenantId};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: ChatSession) -> Result<ChatSession, PersistenceError>;
    async fn get(&self, tenant_id: TenantId, session_id: Uuid) -> Result<Option<ChatSession>, PersistenceError>;
    async fn list(&self, tenant_id: TenantId) -> Result<Vec<ChatSession>, PersistenceError>;
    async fn touch(&self, tenant_id: TenantId, session_id: Uuid) -> Result<(), PersistenceError>;
    async fn delete(&self, tenant_id: TenantId, session_id: Uuid) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, PersistenceError>;
    async fn list(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, PersistenceError>;
    async fn delete_for_session(&self, session_id: Uuid) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upsert(&self, document: Document) -> Result<Document, PersistenceError>;
    async fn get(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, PersistenceError>;
    async fn list_by_collection(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
    ) -> Result<Vec<Document>, PersistenceError>;
    async fn delete(&self, tenant_id: TenantId, document_id: DocumentId) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn upsert_many(&self, chunks: Vec<Chunk>) -> Result<(), PersistenceError>;
    async fn get(&self, chunk_id: Uuid) -> Result<Option<Chunk>, PersistenceError>;
    async fn get_many(&self, chunk_ids: &[Uuid]) -> Result<Vec<Chunk>, PersistenceError>;
    /// Chunks for `document_id` with `chunk_index` in `start..=end`, ordered
    /// by index. Used by the Context Expander's window fetch.
    async fn get_window(
        &self,
        document_id: DocumentId,
        start: i32,
        end: i32,
    ) -> Result<Vec<Chunk>, PersistenceError>;
    async fn delete_for_document(&self, document_id: DocumentId) -> Result<(), PersistenceError>;
}
