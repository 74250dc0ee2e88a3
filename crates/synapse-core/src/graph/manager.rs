//! Per-(tenant, collection) graph library instance cache: a keyed map of
//! lazily-constructed instances, each with its own per-key init lock and an
//! idempotent shutdown path.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::GraphError;
use crate::types::{CollectionId, GraphContext, TenantId};

/// Contract the manager holds for whatever graph library a deployment
/// chooses (LightRAG or equivalent). `insert`/`query` operate on a single
/// already-initialized instance; `finalize` releases its resources.
#[async_trait]
pub trait GraphLibrary: Send + Sync {
    async fn insert(&self, document_id: &str, content: &str) -> Result<(), GraphError>;
    async fn query(&self, query: &str, mode: &str) -> Result<GraphContext, GraphError>;
    async fn finalize(&self);
}

/// Constructs a fresh [`GraphLibrary`] instance rooted at `working_dir`.
/// Implemented by whatever concrete graph library a deployment links in;
/// kept separate from [`GraphLibrary`] itself so the manager can construct
/// instances without depending on a concrete type.
#[async_trait]
pub trait GraphLibraryFactory: Send + Sync {
    async fn build(&self, working_dir: &std::path::Path) -> Result<Arc<dyn GraphLibrary>, GraphError>;
}

struct GraphInstanceCell {
    instance: Arc<dyn GraphLibrary>,
    /// Tags the Tokio runtime handle id the instance was created under, so
    /// a scheduler-affinity change (e.g. a second `#[tokio::test]` runtime
    /// in the same process) is detected on the next `get`.
    runtime_id: tokio::runtime::Id,
}

/// Process-wide manager. Each `(tenant, collection)` key owns exactly one
/// live instance at a time and its own init lock, so construction never
/// blocks unrelated keys — mutation is serialized per key, not globally.
pub struct GraphInstanceManager {
    root: PathBuf,
    instances: DashMap<(TenantId, CollectionId), GraphInstanceCell>,
    init_locks: DashMap<(TenantId, CollectionId), Arc<Mutex<()>>>,
    factory: Arc<dyn GraphLibraryFactory>,
}

impl GraphInstanceManager {
    pub fn new(root: PathBuf, factory: Arc<dyn GraphLibraryFactory>) -> Self {
        Self {
            root,
            instances: DashMap::new(),
            init_locks: DashMap::new(),
            factory,
        }
    }

    fn working_dir(&self, tenant_id: TenantId, collection_id: CollectionId) -> PathBuf {
        self.root
            .join("users")
            .join(tenant_id.to_string())
            .join("collections")
            .join(collection_id.to_string())
    }

    fn init_lock(&self, key: (TenantId, CollectionId)) -> Arc<Mutex<()>> {
        self.init_locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Returns the live instance for `(tenant_id, collection_id)`, building
    /// one if absent or if the current runtime handle differs from the one
    /// the cached instance was built under. On a scheduler-affinity
    /// mismatch the stale instance is dropped *without* awaiting its
    /// `finalize()`, since the underlying library's suspension primitives
    /// are bound to the scheduler they were created on and cannot be
    /// transferred or safely awaited from a different one.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
    ) -> Result<Arc<dyn GraphLibrary>, GraphError> {
        let key = (tenant_id, collection_id);
        let current_runtime = tokio::runtime::Handle::current().id();

        if let Some(cell) = self.instances.get(&key)
            && cell.runtime_id == current_runtime
        {
            return Ok(cell.instance.clone());
        }

        let lock = self.init_lock(key);
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another task may have rebuilt
        // the instance for this key while we waited.
        if let Some(cell) = self.instances.get(&key)
            && cell.runtime_id == current_runtime
        {
            return Ok(cell.instance.clone());
        }

        // Discard the stale entry, if any, without awaiting finalize().
        self.instances.remove(&key);

        let working_dir = self.working_dir(tenant_id, collection_id);
        tokio::fs::create_dir_all(&working_dir)
            .await
            .map_err(|source| GraphError::WorkingDir {
                path: working_dir.display().to_string(),
                source,
            })?;

        let instance = self.factory.build(&working_dir).await?;
        self.instances.insert(
            key,
            GraphInstanceCell {
                instance: instance.clone(),
                runtime_id: current_runtime,
            },
        );
        Ok(instance)
    }

    /// Finalizes and removes the instance for a collection, then removes
    /// its working directory. Unlike the scheduler-affinity discard path,
    /// this is an explicit lifecycle call and does await `finalize()`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_collection(
        &self,
        tenant_id: TenantId,
        collection_id: CollectionId,
    ) -> Result<(), GraphError> {
        let key = (tenant_id, collection_id);
        if let Some((_, cell)) = self.instances.remove(&key) {
            cell.instance.finalize().await;
        }
        self.init_locks.remove(&key);
        let working_dir = self.working_dir(tenant_id, collection_id);
        let _ = tokio::fs::remove_dir_all(&working_dir).await;
        Ok(())
    }

    /// Finalizes and removes every instance for a tenant, then removes the
    /// tenant's whole working-dir subtree.
    #[tracing::instrument(skip(self))]
    pub async fn delete_tenant(&self, tenant_id: TenantId) -> Result<(), GraphError> {
        let keys: Vec<_> = self
            .instances
            .iter()
            .map(|entry| *entry.key())
            .filter(|(t, _)| *t == tenant_id)
            .collect();
        for key in keys {
            if let Some((_, cell)) = self.instances.remove(&key) {
                cell.instance.finalize().await;
            }
            self.init_locks.remove(&key);
        }
        let tenant_dir = self.root.join("users").join(tenant_id.to_string());
        let _ = tokio::fs::remove_dir_all(&tenant_dir).await;
        Ok(())
    }

    /// Finalizes every cached instance process-wide. Called at shutdown.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup(&self) {
        let keys: Vec<_> = self.instances.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, cell)) = self.instances.remove(&key) {
                cell.instance.finalize().await;
            }
        }
    }
}
