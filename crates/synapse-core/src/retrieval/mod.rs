//! Retrieval Orchestrator: cache, reformulate, embed, search (base and/or
//! graph), fuse, rerank, expand, cache-write.
//!
//! Base search and graph augmentation run concurrently rather than
//! sequentially — they are independent once the query is embedded — and a
//! cache write never fails the request: the orchestrator logs and moves on,
//! matching the Cache component's fail-open policy everywhere else in this
//! crate.

mod error;
mod reformulate;
#[cfg(test)]
mod tests;

pub use error::RetrievalError;
pub use reformulate::{LlmQueryReformulator, NoopQueryReformulator, QueryReformulator};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{CacheStore, Keyspace};
use crate::config::Config;
use crate::context::ContextExpander;
use crate::embedding::Embedder;
use crate::graph::GraphInstanceManager;
use crate::hashing;
use crate::hierarchical::HierarchicalSearch;
use crate::persistence::ChunkStore;
use crate::reasoning::{ReasoningError, SubQueryRetriever};
use crate::scoring::Reranker;
use crate::search::{self, KeywordSearchBackend, MetadataFilter, SearchError, VectorSearchBackend, hybrid_search};
use crate::types::{CollectionId, GraphChunk, GraphContext, GraphReference, Hit, TenantId};

/// How the caller wants base search dispatched. Independent of the
/// `enable_graph`/`hierarchical` flags except for `Graph`, which bypasses
/// base search entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
    Graph,
}

impl SearchMode {
    fn requires_query_vector(self) -> bool {
        matches!(self, SearchMode::Semantic | SearchMode::Hybrid)
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub tenant_id: TenantId,
    pub collection_id: CollectionId,
    pub query: String,
    pub mode: SearchMode,
    pub top_k: usize,
    pub document_type: Option<String>,
    pub rerank: bool,
    pub enable_graph: bool,
    pub hierarchical: bool,
    pub expand_context: bool,
    pub metadata_filter: Option<MetadataFilter>,
}

const MIN_TOP_K: usize = 1;
const MAX_TOP_K: usize = 100;
const REFORMULATION_STRATEGY: &str = "expand";

impl RetrievalRequest {
    /// Builds a request with the standard defaults: `top_k=10`,
    /// `rerank`/`enable_graph`/`hierarchical`/`expand_context` all `true`.
    pub fn new(tenant_id: TenantId, collection_id: CollectionId, query: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            tenant_id,
            collection_id,
            query: query.into(),
            mode,
            top_k: 10,
            document_type: None,
            rerank: true,
            enable_graph: true,
            hierarchical: true,
            expand_context: true,
            metadata_filter: None,
        }
    }

    fn validate(&self) -> Result<(), RetrievalError> {
        if self.query.trim().is_empty() {
            return Err(RetrievalError::Validation("query must not be empty".to_string()));
        }
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&self.top_k) {
            return Err(RetrievalError::Validation(format!(
                "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {}",
                self.top_k
            )));
        }
        Ok(())
    }

    /// Merges `document_type` into `metadata_filter` under the whitelisted
    /// `document_type` key and validates the result.
    fn effective_filter(&self) -> Result<Option<MetadataFilter>, RetrievalError> {
        let mut filter = self.metadata_filter.clone().unwrap_or_default();
        if let Some(document_type) = &self.document_type {
            filter.insert("document_type".to_string(), document_type.clone());
        }
        if filter.is_empty() {
            return Ok(None);
        }
        search::validate_metadata_filter(&filter)?;
        Ok(Some(filter))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub results: Vec<Hit>,
    pub query: String,
    pub mode: SearchMode,
    pub total_results: usize,
    pub graph_enhanced: bool,
    pub graph_context: Option<String>,
    pub graph_references: Vec<GraphReference>,
    pub retrieval_latency_ms: u64,
}

/// Cache payload for the `search:` keyspace. Readers accept either shape —
/// a bare results list or the tagged object — since older cache entries may
/// still hold the bare shape; writers always emit
/// [`CachedSearchPayload::Tagged`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CachedSearchPayload {
    Tagged(TaggedSearchPayload),
    Legacy(Vec<Hit>),
}

#[derive(Debug, Serialize, Deserialize)]
struct TaggedSearchPayload {
    results: Vec<Hit>,
    graph_enhanced: bool,
    graph_context: Option<String>,
    #[serde(default)]
    graph_references: Vec<GraphReference>,
}

/// Canonical, stably-ordered projection of a request's cache-relevant
/// parameters. Field order here is the serialized key order — see
/// [`crate::hashing::search_key`].
#[derive(Serialize)]
struct SearchCacheParams {
    mode: SearchMode,
    top_k: usize,
    collection_id: CollectionId,
    tenant_id: TenantId,
    rerank: bool,
    enable_graph: bool,
    hierarchical: bool,
    document_type: Option<String>,
    metadata_filter: BTreeMap<String, String>,
}

/// The nine-step retrieval pipeline. Generic over the chunk store so it can
/// hold a [`ContextExpander`] directly, matching that type's own generic
/// shape rather than erasing it behind a second trait object.
pub struct RetrievalOrchestrator<C: ChunkStore> {
    cache: Arc<dyn CacheStore>,
    reformulator: Arc<dyn QueryReformulator>,
    embedder: Arc<dyn Embedder>,
    vector: Arc<dyn VectorSearchBackend>,
    keyword: Arc<dyn KeywordSearchBackend>,
    hierarchical: Arc<HierarchicalSearch>,
    reranker: Arc<dyn Reranker>,
    graph: Arc<GraphInstanceManager>,
    context_expander: Arc<ContextExpander<C>>,
    config: Arc<Config>,
}

impl<C: ChunkStore> RetrievalOrchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: Arc<dyn CacheStore>,
        reformulator: Arc<dyn QueryReformulator>,
        embedder: Arc<dyn Embedder>,
        vector: Arc<dyn VectorSearchBackend>,
        keyword: Arc<dyn KeywordSearchBackend>,
        hierarchical: Arc<HierarchicalSearch>,
        reranker: Arc<dyn Reranker>,
        graph: Arc<GraphInstanceManager>,
        context_expander: Arc<ContextExpander<C>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            cache,
            reformulator,
            embedder,
            vector,
            keyword,
            hierarchical,
            reranker,
            graph,
            context_expander,
            config,
        }
    }

    fn cache_key(&self, request: &RetrievalRequest) -> [u8; 32] {
        let params = SearchCacheParams {
            mode: request.mode,
            top_k: request.top_k,
            collection_id: request.collection_id,
            tenant_id: request.tenant_id,
            rerank: request.rerank,
            enable_graph: request.enable_graph,
            hierarchical: request.hierarchical,
            document_type: request.document_type.clone(),
            metadata_filter: request
                .metadata_filter
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect(),
        };
        let canonical = serde_json::to_string(&params).unwrap_or_default();
        hashing::search_key(&request.query, &canonical)
    }

    /// Runs the full pipeline. Validation failures (unknown mode reaching
    /// here unvalidated, an oversized metadata filter, `top_k` out of range,
    /// or graph requested while disabled) short-circuit before any
    /// collaborator is called.
    #[tracing::instrument(skip(self, request), fields(tenant_id = %request.tenant_id, mode = ?request.mode))]
    pub async fn retrieve(&self, request: RetrievalRequest) -> Result<RetrievalResponse, RetrievalError> {
        let start = Instant::now();
        request.validate()?;
        let metadata_filter = request.effective_filter()?;

        let cache_key = self.cache_key(&request);
        if let Some(bytes) = self.cache.get(Keyspace::Search, &cache_key) {
            match Self::decode_cache_payload(&bytes, &request, start.elapsed().as_millis() as u64) {
                Some(response) => return Ok(response),
                None => {
                    tracing::warn!("corrupted search cache entry, evicting and recomputing");
                    self.cache.evict(Keyspace::Search, &cache_key);
                }
            }
        }

        let reformulated_query = self.reformulate_cached(&request.query, request.tenant_id).await;

        let needs_vector =
            !matches!(request.mode, SearchMode::Graph) && (request.hierarchical || request.mode.requires_query_vector());
        let query_vector = if needs_vector {
            Some(self.embedder.embed(&reformulated_query).await?)
        } else {
            None
        };

        let (hits, graph_enhanced, graph_context, graph_references) = match request.mode {
            SearchMode::Graph => {
                if !self.config.graph.enabled {
                    return Err(RetrievalError::GraphDisabled);
                }
                let graph_result = self
                    .graph_query(request.tenant_id, request.collection_id, &reformulated_query)
                    .await?;
                let hits = graph_chunks_to_hits(&graph_result.chunks, request.collection_id, false);
                (hits, true, Some(graph_result.answer), graph_result.references)
            }
            _ => {
                if request.enable_graph && self.config.graph.enabled {
                    let (base_result, graph_opt) = tokio::join!(
                        self.base_search(&request, &reformulated_query, query_vector.as_deref(), metadata_filter.as_ref()),
                        self.graph_query_augment(request.tenant_id, request.collection_id, &reformulated_query),
                    );
                    let base_hits = base_result?;
                    match graph_opt {
                        Some(graph_result) => {
                            let fused = enrich_with_graph(base_hits, &graph_result.chunks, request.collection_id);
                            (fused, true, Some(graph_result.answer), graph_result.references)
                        }
                        None => (base_hits, false, None, Vec::new()),
                    }
                } else {
                    let base_hits = self
                        .base_search(&request, &reformulated_query, query_vector.as_deref(), metadata_filter.as_ref())
                        .await?;
                    (base_hits, false, None, Vec::new())
                }
            }
        };

        // Reranking always scores against the original, unreformulated
        // query — reformulation is an embedding-side recall aid, not a
        // rewrite of user intent.
        let hits = if request.rerank && self.reranker.is_available() && !hits.is_empty() {
            self.reranker.rerank(&request.query, hits).await?
        } else {
            hits
        };

        let mut hits = hits;
        hits.truncate(request.top_k);

        let hits = if request.expand_context {
            self.context_expander.expand(hits).await?
        } else {
            hits
        };

        let response = RetrievalResponse {
            total_results: hits.len(),
            results: hits,
            query: request.query.clone(),
            mode: request.mode,
            graph_enhanced,
            graph_context,
            graph_references,
            retrieval_latency_ms: start.elapsed().as_millis() as u64,
        };

        self.write_cache(cache_key, &response, request.tenant_id);
        Ok(response)
    }

    fn decode_cache_payload(bytes: &[u8], request: &RetrievalRequest, elapsed_ms: u64) -> Option<RetrievalResponse> {
        let payload: CachedSearchPayload = serde_json::from_slice(bytes).ok()?;
        let (results, graph_enhanced, graph_context, graph_references) = match payload {
            CachedSearchPayload::Tagged(tagged) => {
                (tagged.results, tagged.graph_enhanced, tagged.graph_context, tagged.graph_references)
            }
            CachedSearchPayload::Legacy(results) => (results, false, None, Vec::new()),
        };
        Some(RetrievalResponse {
            total_results: results.len(),
            results,
            query: request.query.clone(),
            mode: request.mode,
            graph_enhanced,
            graph_context,
            graph_references,
            retrieval_latency_ms: elapsed_ms,
        })
    }

    fn write_cache(&self, key: [u8; 32], response: &RetrievalResponse, tenant_id: TenantId) {
        let payload = CachedSearchPayload::Tagged(TaggedSearchPayload {
            results: response.results.clone(),
            graph_enhanced: response.graph_enhanced,
            graph_context: response.graph_context.clone(),
            graph_references: response.graph_references.clone(),
        });
        if let Ok(bytes) = serde_json::to_vec(&payload) {
            self.cache.set(Keyspace::Search, key, tenant_id, bytes);
        }
    }

    async fn base_search(
        &self,
        request: &RetrievalRequest,
        query: &str,
        query_vector: Option<&[f32]>,
        metadata_filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Hit>, RetrievalError> {
        if request.hierarchical {
            let vector = query_vector.ok_or_else(|| {
                RetrievalError::Validation("hierarchical search requires a query embedding".to_string())
            })?;
            return Ok(self
                .hierarchical
                .search(request.tenant_id, request.collection_id, query, vector, request.top_k, metadata_filter)
                .await?);
        }

        match request.mode {
            SearchMode::Semantic => {
                let vector = query_vector.ok_or_else(|| {
                    RetrievalError::Validation("semantic search requires a query embedding".to_string())
                })?;
                Ok(self
                    .vector
                    .search(request.tenant_id, request.collection_id, vector, request.top_k, metadata_filter, None)
                    .await?)
            }
            SearchMode::Keyword => Ok(self
                .keyword
                .search(request.tenant_id, request.collection_id, query, request.top_k, metadata_filter, None)
                .await?),
            SearchMode::Hybrid => {
                let vector = query_vector
                    .ok_or_else(|| RetrievalError::Validation("hybrid search requires a query embedding".to_string()))?;
                Ok(hybrid_search(
                    &*self.vector,
                    &*self.keyword,
                    request.tenant_id,
                    request.collection_id,
                    query,
                    vector,
                    request.top_k,
                    metadata_filter,
                    None,
                )
                .await?)
            }
            SearchMode::Graph => unreachable!("graph mode is dispatched before base_search is called"),
        }
    }

    /// Reformulates `query`, going through the `query_reform:` cache
    /// keyspace first. A cache miss that also fails reformulation falls back
    /// to the original query rather than erroring — reformulation is a
    /// recall aid, never load-bearing for correctness.
    async fn reformulate_cached(&self, query: &str, tenant_id: TenantId) -> String {
        if !self.reformulator.is_available() {
            return query.to_string();
        }

        let key = hashing::query_reform_key(query, REFORMULATION_STRATEGY);
        if let Some(bytes) = self.cache.get(Keyspace::QueryReform, &key)
            && let Ok(cached) = String::from_utf8(bytes)
        {
            return cached;
        }

        let reformulated = self
            .reformulator
            .reformulate(query, REFORMULATION_STRATEGY)
            .await
            .unwrap_or_else(|_| query.to_string());

        self.cache.set(Keyspace::QueryReform, key, tenant_id, reformulated.clone().into_bytes());
        reformulated
    }

    async fn graph_query(&self, tenant_id: TenantId, collection_id: CollectionId, query: &str) -> Result<GraphContext, RetrievalError> {
        let instance = self.graph.get(tenant_id, collection_id).await?;
        Ok(instance.query(query, &self.config.graph.default_mode).await?)
    }

    /// Like [`Self::graph_query`], but swallows any failure to `None` — used
    /// when graph results are augmenting another mode rather than being the
    /// only result source, where an unreachable graph should degrade the
    /// response, not fail the request.
    async fn graph_query_augment(&self, tenant_id: TenantId, collection_id: CollectionId, query: &str) -> Option<GraphContext> {
        match self.graph_query(tenant_id, collection_id, query).await {
            Ok(context) => Some(context),
            Err(err) => {
                tracing::warn!(error = %err, "graph augmentation failed, continuing with base results only");
                None
            }
        }
    }
}

/// Converts graph library chunks into [`Hit`]s for pure graph-mode results.
/// `clamp_score` is applied only when these hits are fused into another
/// mode's results (see [`enrich_with_graph`]); a pure graph-mode response
/// reports the library's own scores unmodified.
fn graph_chunks_to_hits(chunks: &[GraphChunk], collection_id: CollectionId, clamp_score: bool) -> Vec<Hit> {
    chunks
        .iter()
        .map(|chunk| {
            let chunk_id = chunk_uuid(&chunk.chunk_id);
            let score = if clamp_score { chunk.score.min(GRAPH_ENRICHMENT_SCORE_CAP) } else { chunk.score };
            Hit {
                chunk_id,
                content: chunk.content.clone(),
                chunk_index: 0,
                score,
                rerank_score: None,
                metadata: chunk.metadata.clone(),
                chunk_metadata: std::collections::HashMap::new(),
                document: crate::types::DocumentInfo {
                    id: chunk_id,
                    title: graph_document_title(chunk),
                    filename: String::new(),
                },
                collection_id,
                expanded_content: None,
                context_window: None,
            }
        })
        .collect()
}

fn graph_document_title(chunk: &GraphChunk) -> String {
    chunk
        .metadata
        .get("document_title")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_default()
}

/// A graph chunk id is not guaranteed to be a UUID (the graph library mints
/// its own ids); non-UUID ids are mapped deterministically via the first 16
/// bytes of their SHA-256 digest so the same graph chunk always yields the
/// same synthetic chunk id across calls.
fn chunk_uuid(raw: &str) -> Uuid {
    if let Ok(parsed) = Uuid::parse_str(raw) {
        return parsed;
    }
    let digest = hashing::sha256(raw.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Score enrichment hits are capped at, so a graph-sourced chunk can never
/// outrank a base hit the underlying store actually scored above it.
const GRAPH_ENRICHMENT_SCORE_CAP: f32 = 0.70;

/// Fuses graph chunks into `base_hits`: duplicates (by chunk id) are
/// dropped, new chunks are appended with `metadata.graph_sourced = true` and
/// their score clamped to [`GRAPH_ENRICHMENT_SCORE_CAP`]. Base hit order is
/// preserved; enrichment hits are appended after.
fn enrich_with_graph(base_hits: Vec<Hit>, graph_chunks: &[GraphChunk], collection_id: CollectionId) -> Vec<Hit> {
    let existing: std::collections::HashSet<Uuid> = base_hits.iter().map(|h| h.chunk_id).collect();
    let mut hits = base_hits;
    let mut enrichment = graph_chunks_to_hits(graph_chunks, collection_id, true);
    for hit in &mut enrichment {
        hit.metadata.insert("graph_sourced".to_string(), serde_json::Value::Bool(true));
    }
    for hit in enrichment {
        if existing.contains(&hit.chunk_id) {
            continue;
        }
        hits.push(hit);
    }
    hits
}

/// Adapts the orchestrator to the Deep Reasoner's sub-query retrieval
/// contract: hybrid search, reranked, with graph and context expansion both
/// switched off (the reasoner does its own cross-sub-query synthesis and
/// calls the context expander itself over the merged result, see
/// [`crate::reasoning::DeepReasoner`]).
#[async_trait]
impl<C: ChunkStore> SubQueryRetriever for RetrievalOrchestrator<C> {
    async fn retrieve(&self, tenant_id: TenantId, collection_id: CollectionId, query: &str, top_k: usize) -> Result<Vec<Hit>, ReasoningError> {
        let request = RetrievalRequest {
            tenant_id,
            collection_id,
            query: query.to_string(),
            mode: SearchMode::Hybrid,
            top_k,
            document_type: None,
            rerank: true,
            enable_graph: false,
            hierarchical: false,
            expand_context: false,
            metadata_filter: None,
        };
        let response = RetrievalOrchestrator::retrieve(self, request).await?;
        Ok(response.results)
    }
}

impl From<RetrievalError> for ReasoningError {
    fn from(err: RetrievalError) -> Self {
        ReasoningError::Search(SearchError::VectorSearchFailed { reason: err.to_string() })
    }
}
