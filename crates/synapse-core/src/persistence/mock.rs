//! In-memory persistence, for tests and for running the gateway without a
//! database attached (`SYNAPSE_MOCK_PROVIDER`-style deployments).

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{ChunkStore, DocumentStore, MessageStore, PersistenceError, SessionStore};
use crate::types::{ChatMessage, ChatSession, Chunk, CollectionId, Document, DocumentId, TenantId};

#[derive(Debug, Default)]
pub struct MockSessionStore {
    sessions: DashMap<Uuid, ChatSession>,
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn create(&self, session: ChatSession) -> Result<ChatSession, PersistenceError> {
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        session_id: Uuid,
    ) -> Result<Option<ChatSession>, PersistenceError> {
        Ok(self
            .sessions
            .get(&session_id)
            .filter(|s| s.tenant_id == tenant_id)
            .map(|s| s.clone()))
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<ChatSession>, PersistenceError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .map(|s| s.clone())
            .collect())
    }

    async fn touch(&self, tenant_id: TenantId, session_id: Uuid) -> Result<(), PersistenceError> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .filter(|s| s.tenant_id == tenant_id)
            .ok_or(PersistenceError::NotFound)?;
        entry.last_message_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete(&self, tenant_id: TenantId, session_id: Uuid) -> Result<(), PersistenceError> {
        if self
            .sessions
            .get(&session_id)
            .map(|s| s.tenant_id == tenant_id)
            .unwrap_or(false)
        {
            self.sessions.remove(&session_id);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockMessageStore {
    /// session_id -> ordered messages, protected by the DashMap's own
    /// per-shard locking.
    messages: DashMap<Uuid, Vec<ChatMessage>>,
}

#[async_trait]
impl MessageStore for MockMessageStore {
    async fn append(&self, message: ChatMessage) -> Result<ChatMessage, PersistenceError> {
        self.messages
            .entry(message.session_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, PersistenceError> {
        Ok(self
            .messages
            .get(&session_id)
            .map(|m| m.clone())
            .unwrap_or_default())
    }

    async fn delete_for_session(&self, session_id: Uuid) -> Result<(), PersistenceError> {
        self.messages.remove(&session_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockDocumentStore {
    documents: DashMap<DocumentId, Document>,
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn upsert(&self, document: Document) -> Result<Document, PersistenceError> {
        self.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, PersistenceError> {
        Ok(self
            .documents
            .get(&document_id)
            .filter(|d| d.tenant_id == tenant_id)
            .map(|d| d.clone()))
    }

    async fn list_by_collection(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
    ) -> Result<Vec<Document>, PersistenceError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.tenant_id == tenant_id && d.collection_id == collection_id)
            .map(|d| d.clone())
            .collect())
    }

    async fn delete(&self, tenant_id: TenantId, document_id: DocumentId) -> Result<(), PersistenceError> {
        if self
            .documents
            .get(&document_id)
            .map(|d| d.tenant_id == tenant_id)
            .unwrap_or(false)
        {
            self.documents.remove(&document_id);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockChunkStore {
    chunks: DashMap<Uuid, Chunk>,
    /// document_id -> chunk ids, to serve `get_window` without a full scan.
    by_document: DashMap<DocumentId, Vec<Uuid>>,
}

#[async_trait]
impl ChunkStore for MockChunkStore {
    async fn upsert_many(&self, chunks: Vec<Chunk>) -> Result<(), PersistenceError> {
        for chunk in chunks {
            self.by_document
                .entry(chunk.document_id)
                .or_default()
                .push(chunk.chunk_id);
            self.chunks.insert(chunk.chunk_id, chunk);
        }
        Ok(())
    }

    async fn get(&self, chunk_id: Uuid) -> Result<Option<Chunk>, PersistenceError> {
        Ok(self.chunks.get(&chunk_id).map(|c| c.clone()))
    }

    async fn get_many(&self, chunk_ids: &[Uuid]) -> Result<Vec<Chunk>, PersistenceError> {
        Ok(chunk_ids
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|c| c.clone()))
            .collect())
    }

    async fn get_window(
        &self,
        document_id: DocumentId,
        start: i32,
        end: i32,
    ) -> Result<Vec<Chunk>, PersistenceError> {
        let Some(ids) = self.by_document.get(&document_id) else {
            return Ok(Vec::new());
        };
        let mut window: Vec<Chunk> = ids
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|c| c.clone()))
            .filter(|c| c.chunk_index >= start && c.chunk_index <= end)
            .collect();
        window.sort_by_key(|c| c.chunk_index);
        Ok(window)
    }

    async fn delete_for_document(&self, document_id: DocumentId) -> Result<(), PersistenceError> {
        if let Some((_, ids)) = self.by_document.remove(&document_id) {
            for id in ids {
                self.chunks.remove(&id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentStatus, MessageRole};
    use std::collections::HashMap as StdHashMap;

    fn sample_document(tenant_id: TenantId, collection_id: CollectionId) -> Document {
        Document {
            id: Uuid::new_v4(),
            tenant_id,
            collection_id,
            title: "Doc".to_string(),
            filename: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            status: DocumentStatus::Completed,
            document_vector: None,
            summary: None,
            domain_processor: None,
        }
    }

    fn sample_chunk(document_id: DocumentId, tenant_id: TenantId, collection_id: CollectionId, index: i32) -> Chunk {
        Chunk {
            chunk_id: Uuid::new_v4(),
            document_id,
            collection_id,
            tenant_id,
            chunk_index: index,
            content: format!("chunk {index}"),
            search_content: format!("chunk {index}"),
            vector: None,
            metadata: StdHashMap::new(),
            chunk_metadata: StdHashMap::new(),
        }
    }

    #[tokio::test]
    async fn document_store_isolates_tenants() {
        let store = MockDocumentStore::default();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        let collection = Uuid::new_v4();
        let doc = sample_document(tenant_a, collection);
        let doc_id = doc.id;
        store.upsert(doc).await.unwrap();

        assert!(store.get(tenant_b, doc_id).await.unwrap().is_none());
        assert!(store.get(tenant_a, doc_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn chunk_store_window_is_ordered_and_bounded() {
        let store = MockChunkStore::default();
        let document_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let collection_id = Uuid::new_v4();
        let chunks = (0..5)
            .map(|i| sample_chunk(document_id, tenant_id, collection_id, i))
            .collect::<Vec<_>>();
        store.upsert_many(chunks).await.unwrap();

        let window = store.get_window(document_id, 1, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].chunk_index, 1);
        assert_eq!(window[2].chunk_index, 3);
    }

    #[tokio::test]
    async fn message_store_preserves_append_order() {
        let store = MockMessageStore::default();
        let session_id = Uuid::new_v4();
        for i in 0..3 {
            store
                .append(ChatMessage {
                    id: Uuid::new_v4(),
                    session_id,
                    role: MessageRole::User,
                    content: format!("message {i}"),
                    chunk_ids: Vec::new(),
                    metadata: StdHashMap::new(),
                    created_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        let messages = store.list(session_id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "message 0");
        assert_eq!(messages[2].content, "message 2");
    }
}
