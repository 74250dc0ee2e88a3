use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::*;
use crate::cache::MokaCacheStore;
use crate::config::{CacheConfig, ContextConfig, HierarchicalConfig};
use crate::context::ContextExpander;
use crate::embedding::mock::MockEmbedder;
use crate::graph::{GraphError, GraphInstanceManager, GraphLibrary, GraphLibraryFactory};
use crate::persistence::DocumentStore;
use crate::persistence::mock::{MockChunkStore, MockDocumentStore};
use crate::scoring::IdentityReranker;
use crate::types::{DocumentId, DocumentInfo};

struct CountingVectorBackend {
    hits: Vec<Hit>,
    calls: AtomicUsize,
}

impl CountingVectorBackend {
    fn new(hits: Vec<Hit>) -> Self {
        Self { hits, calls: AtomicUsize::new(0) }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorSearchBackend for CountingVectorBackend {
    async fn search(
        &self,
        _tenant_id: TenantId,
        _collection_id: CollectionId,
        _query_vector: &[f32],
        top_k: usize,
        _metadata_filter: Option<&MetadataFilter>,
        _document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut hits = self.hits.clone();
        hits.truncate(top_k);
        Ok(hits)
    }
}

struct EmptyKeywordBackend;

#[async_trait]
impl KeywordSearchBackend for EmptyKeywordBackend {
    async fn search(
        &self,
        _tenant_id: TenantId,
        _collection_id: CollectionId,
        _query: &str,
        _top_k: usize,
        _metadata_filter: Option<&MetadataFilter>,
        _document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Hit>, SearchError> {
        Ok(Vec::new())
    }
}

struct StubGraphLibrary {
    context: GraphContext,
}

#[async_trait]
impl GraphLibrary for StubGraphLibrary {
    async fn insert(&self, _document_id: &str, _content: &str) -> Result<(), GraphError> {
        Ok(())
    }

    async fn query(&self, _query: &str, _mode: &str) -> Result<GraphContext, GraphError> {
        Ok(self.context.clone())
    }

    async fn finalize(&self) {}
}

struct StubGraphFactory {
    context: GraphContext,
}

#[async_trait]
impl GraphLibraryFactory for StubGraphFactory {
    async fn build(&self, _working_dir: &Path) -> Result<Arc<dyn GraphLibrary>, GraphError> {
        Ok(Arc::new(StubGraphLibrary { context: self.context.clone() }))
    }
}

fn sample_hit(score: f32) -> Hit {
    Hit {
        chunk_id: Uuid::new_v4(),
        content: "content".to_string(),
        chunk_index: 0,
        score,
        rerank_score: None,
        metadata: Default::default(),
        chunk_metadata: Default::default(),
        document: DocumentInfo {
            id: Uuid::new_v4(),
            title: "Doc".to_string(),
            filename: "doc.pdf".to_string(),
        },
        collection_id: Uuid::new_v4(),
        expanded_content: None,
        context_window: None,
    }
}

fn build_orchestrator(
    vector: Arc<dyn VectorSearchBackend>,
    graph_factory: Arc<dyn GraphLibraryFactory>,
    graph_enabled: bool,
) -> (RetrievalOrchestrator<MockChunkStore>, Arc<MokaCacheStore>) {
    build_orchestrator_with_reformulator(vector, graph_factory, graph_enabled, Arc::new(NoopQueryReformulator))
}

fn build_orchestrator_with_reformulator(
    vector: Arc<dyn VectorSearchBackend>,
    graph_factory: Arc<dyn GraphLibraryFactory>,
    graph_enabled: bool,
    reformulator: Arc<dyn QueryReformulator>,
) -> (RetrievalOrchestrator<MockChunkStore>, Arc<MokaCacheStore>) {
    let cache = Arc::new(MokaCacheStore::new(&CacheConfig::default()));
    let documents: Arc<dyn DocumentStore> = Arc::new(MockDocumentStore::default());
    let chunks = Arc::new(MockChunkStore::default());
    let keyword: Arc<dyn KeywordSearchBackend> = Arc::new(EmptyKeywordBackend);
    let hierarchical = Arc::new(HierarchicalSearch::new(
        documents,
        vector.clone(),
        keyword.clone(),
        HierarchicalConfig::default(),
    ));
    let context_expander = Arc::new(ContextExpander::new(chunks, ContextConfig::default()));
    let mut config = Config::default();
    config.graph.enabled = graph_enabled;
    let graph = Arc::new(GraphInstanceManager::new(
        std::env::temp_dir().join(format!("synapse-retrieval-test-{}", Uuid::new_v4())),
        graph_factory,
    ));

    let orchestrator = RetrievalOrchestrator::new(
        cache.clone(),
        reformulator,
        Arc::new(MockEmbedder::new(8)),
        vector,
        keyword,
        hierarchical,
        Arc::new(IdentityReranker) as Arc<dyn Reranker>,
        graph,
        context_expander,
        Arc::new(config),
    );
    (orchestrator, cache)
}

fn no_graph_factory() -> Arc<dyn GraphLibraryFactory> {
    Arc::new(StubGraphFactory { context: GraphContext::default() })
}

fn base_request(mode: SearchMode) -> RetrievalRequest {
    let mut request = RetrievalRequest::new(Uuid::new_v4(), Uuid::new_v4(), "revenue this quarter", mode);
    request.hierarchical = false;
    request.enable_graph = false;
    request.expand_context = false;
    request.rerank = false;
    request
}

#[tokio::test]
async fn second_call_hits_the_cache_and_skips_base_search() {
    let backend = Arc::new(CountingVectorBackend::new(vec![sample_hit(0.9)]));
    let vector: Arc<dyn VectorSearchBackend> = backend.clone();
    let (orchestrator, _cache) = build_orchestrator(vector, no_graph_factory(), false);

    let request = base_request(SearchMode::Semantic);
    let first = orchestrator.retrieve(request.clone()).await.unwrap();
    let second = orchestrator.retrieve(request).await.unwrap();

    assert_eq!(backend.call_count(), 1);
    assert_eq!(first.results.len(), second.results.len());
    assert_eq!(first.graph_enhanced, second.graph_enhanced);
}

#[tokio::test]
async fn corrupted_cache_entry_is_evicted_even_when_recompute_fails_before_a_fresh_write() {
    // Graph mode with the subsystem disabled errors out before `write_cache`
    // ever runs, so an eviction that only happened incidentally via the
    // next successful write would not show up here.
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(Vec::new()));
    let (orchestrator, cache) = build_orchestrator(vector, no_graph_factory(), false);

    let request = base_request(SearchMode::Graph);
    let cache_key = orchestrator.cache_key(&request);
    cache.set(Keyspace::Search, cache_key, request.tenant_id, b"not valid json".to_vec());

    let err = orchestrator.retrieve(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::GraphDisabled));
    assert!(cache.get(Keyspace::Search, &cache_key).is_none());
}

#[tokio::test]
async fn graph_mode_errors_when_graph_subsystem_is_disabled() {
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(Vec::new()));
    let (orchestrator, _cache) = build_orchestrator(vector, no_graph_factory(), false);

    let request = base_request(SearchMode::Graph);
    let err = orchestrator.retrieve(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::GraphDisabled));
}

#[tokio::test]
async fn out_of_range_top_k_is_rejected_before_any_search() {
    let backend = Arc::new(CountingVectorBackend::new(vec![sample_hit(0.9)]));
    let vector: Arc<dyn VectorSearchBackend> = backend.clone();
    let (orchestrator, _cache) = build_orchestrator(vector, no_graph_factory(), false);

    let mut request = base_request(SearchMode::Semantic);
    request.top_k = 0;
    let err = orchestrator.retrieve(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Validation(_)));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn graph_enrichment_clamps_score_and_tags_sourced_hits() {
    let base_hit = sample_hit(0.5);
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(vec![base_hit.clone()]));

    let graph_context = GraphContext {
        answer: "graph narrative".to_string(),
        chunks: vec![GraphChunk {
            chunk_id: "non-uuid-graph-chunk".to_string(),
            content: "graph-sourced content".to_string(),
            score: 0.95,
            metadata: Default::default(),
        }],
        references: vec![],
    };
    let graph_factory: Arc<dyn GraphLibraryFactory> = Arc::new(StubGraphFactory { context: graph_context });
    let (orchestrator, _cache) = build_orchestrator(vector, graph_factory, true);

    let mut request = base_request(SearchMode::Semantic);
    request.enable_graph = true;
    let response = orchestrator.retrieve(request).await.unwrap();

    assert!(response.graph_enhanced);
    assert_eq!(response.graph_context.as_deref(), Some("graph narrative"));
    assert_eq!(response.results.len(), 2);

    let enriched = response.results.iter().find(|h| h.chunk_id != base_hit.chunk_id).unwrap();
    assert!(enriched.is_graph_sourced());
    assert!(enriched.score <= GRAPH_ENRICHMENT_SCORE_CAP);

    let original = response.results.iter().find(|h| h.chunk_id == base_hit.chunk_id).unwrap();
    assert_eq!(original.score, 0.5);
    assert!(!original.is_graph_sourced());
}

#[tokio::test]
async fn pure_graph_mode_does_not_clamp_scores() {
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(Vec::new()));
    let graph_context = GraphContext {
        answer: "graph narrative".to_string(),
        chunks: vec![GraphChunk {
            chunk_id: Uuid::new_v4().to_string(),
            content: "content".to_string(),
            score: 0.95,
            metadata: Default::default(),
        }],
        references: vec![],
    };
    let graph_factory: Arc<dyn GraphLibraryFactory> = Arc::new(StubGraphFactory { context: graph_context });
    let (orchestrator, _cache) = build_orchestrator(vector, graph_factory, true);

    let request = base_request(SearchMode::Graph);
    let response = orchestrator.retrieve(request).await.unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].score, 0.95);
}

#[tokio::test]
async fn disallowed_metadata_filter_key_is_rejected() {
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(vec![sample_hit(0.9)]));
    let (orchestrator, _cache) = build_orchestrator(vector, no_graph_factory(), false);

    let mut request = base_request(SearchMode::Semantic);
    let mut filter = MetadataFilter::new();
    filter.insert("internal_secret".to_string(), "x".to_string());
    request.metadata_filter = Some(filter);

    let err = orchestrator.retrieve(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::Search(SearchError::DisallowedFilterKey { .. })));
}

#[tokio::test]
async fn reformulation_result_is_cached_across_requests_with_the_same_query() {
    let backend = Arc::new(CountingVectorBackend::new(vec![sample_hit(0.9)]));
    let vector: Arc<dyn VectorSearchBackend> = backend.clone();
    // Only one response queued: a second reformulate() call that bypassed
    // the cache would panic on an exhausted queue.
    let llm = Arc::new(crate::llm::mock::MockLlmClient::new(vec!["expanded revenue query"]));
    let reformulator = Arc::new(LlmQueryReformulator::new(llm));
    let (orchestrator, _cache) = build_orchestrator_with_reformulator(vector, no_graph_factory(), false, reformulator);

    let tenant_id = Uuid::new_v4();
    let collection_id = Uuid::new_v4();
    let mut request = RetrievalRequest::new(tenant_id, collection_id, "revenue this quarter", SearchMode::Semantic);
    request.hierarchical = false;
    request.expand_context = false;
    request.enable_graph = false;

    orchestrator.retrieve(request.clone()).await.unwrap();
    orchestrator.retrieve(request).await.unwrap();
}

#[tokio::test]
async fn sub_query_retriever_uses_hybrid_mode_without_graph_or_expansion() {
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(CountingVectorBackend::new(vec![sample_hit(0.8)]));
    let (orchestrator, _cache) = build_orchestrator(vector, no_graph_factory(), false);

    let hits = SubQueryRetriever::retrieve(&orchestrator, Uuid::new_v4(), Uuid::new_v4(), "sub question", 5)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}
