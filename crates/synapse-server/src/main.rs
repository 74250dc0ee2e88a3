//! Synapse gateway entrypoint: sequential eager construction of every
//! collaborator, then `axum::serve(...).with_graceful_shutdown(...)`.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use synapse_core::cache::{CacheStore, MokaCacheStore};
use synapse_core::chat::ChatOrchestrator;
use synapse_core::config::Config;
use synapse_core::context::ContextExpander;
use synapse_core::embedding::{CandleEmbedder, Embedder};
use synapse_core::followup::FollowUpService;
use synapse_core::graph::{GraphError, GraphInstanceManager, GraphLibrary, GraphLibraryFactory};
use synapse_core::hierarchical::HierarchicalSearch;
use synapse_core::judge::Judge;
use synapse_core::llm::LlmClient;
use synapse_core::llm::genai_client::GenaiLlmClient;
use synapse_core::persistence::mock::{MockChunkStore, MockDocumentStore, MockMessageStore, MockSessionStore};
use synapse_core::reasoning::DeepReasoner;
use synapse_core::retrieval::{NoopQueryReformulator, QueryReformulator, RetrievalOrchestrator};
use synapse_core::scoring::{CrossEncoderReranker, IdentityReranker, Reranker};
use synapse_core::search::{KeywordSearchBackend, MockKeywordBackend, QdrantVectorBackend, VectorSearchBackend};

use synapse_server::gateway::{self, HandlerState};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Stands in for a real graph library (LightRAG or equivalent) — no
/// deployment in this corpus links one in, and `GraphConfig::enabled`
/// defaults to `false`, so this factory is only ever reached if an operator
/// flips that flag on without also swapping in a real implementation.
struct NullGraphFactory;

#[async_trait]
impl GraphLibraryFactory for NullGraphFactory {
    async fn build(&self, _working_dir: &Path) -> Result<Arc<dyn GraphLibrary>, GraphError> {
        Err(GraphError::InitFailed {
            reason: "no graph library backend is configured for this deployment".to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr()?;
    let config = Arc::new(config);

    tracing::info!(bind_addr = %config.bind_addr, port = config.port, "synapse starting");

    let cache: Arc<dyn CacheStore> = Arc::new(MokaCacheStore::new(&config.cache));

    let reformulator: Arc<dyn QueryReformulator> = Arc::new(NoopQueryReformulator);

    let embedder: Arc<dyn Embedder> = if let Some(path) = &config.model_path {
        Arc::new(CandleEmbedder::load(path, config.embedding_dim, 512)?)
    } else {
        tracing::warn!("no SYNAPSE_MODEL_PATH configured, running embedder in mock mode");
        Arc::new(synapse_core::embedding::mock::MockEmbedder::new(config.embedding_dim))
    };

    let qdrant_client = qdrant_client::Qdrant::from_url(&config.qdrant_url)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build qdrant client: {e}"))?;
    let vector: Arc<dyn VectorSearchBackend> = Arc::new(QdrantVectorBackend::new(qdrant_client, "synapse_chunks"));

    let documents = Arc::new(MockDocumentStore::default());
    let chunks = Arc::new(MockChunkStore::default());

    let keyword: Arc<dyn KeywordSearchBackend> = Arc::new(MockKeywordBackend::new(documents.clone(), chunks.clone()));

    let hierarchical = Arc::new(HierarchicalSearch::new(
        documents.clone(),
        vector.clone(),
        keyword.clone(),
        config.hierarchical.clone(),
    ));

    let reranker: Arc<dyn Reranker> = if let Some(path) = &config.rerank.model_path {
        Arc::new(CrossEncoderReranker::load(path, 512)?)
    } else {
        tracing::warn!("no rerank model configured, skipping cross-encoder reranking");
        Arc::new(IdentityReranker)
    };

    let graph = Arc::new(GraphInstanceManager::new(
        config.graph.working_dir.clone(),
        Arc::new(NullGraphFactory),
    ));

    let context_expander = Arc::new(ContextExpander::new(chunks.clone(), config.context));

    let retrieval = Arc::new(RetrievalOrchestrator::new(
        cache.clone(),
        reformulator,
        embedder,
        vector,
        keyword,
        hierarchical,
        reranker,
        graph,
        context_expander.clone(),
        config.clone(),
    ));

    let llm: Arc<dyn LlmClient> = Arc::new(GenaiLlmClient::new(genai::Client::default(), &config.llm));

    let deep_reasoner = Arc::new(DeepReasoner::new(retrieval.clone(), llm.clone(), config.deep_reasoning));
    let judge = Arc::new(Judge::new(llm.clone(), config.judge.clone()));
    let followup = Arc::new(FollowUpService::new(llm.clone()));

    let sessions = Arc::new(MockSessionStore::default());
    let messages = Arc::new(MockMessageStore::default());

    let chat = ChatOrchestrator::new(
        sessions,
        messages,
        retrieval.clone(),
        deep_reasoner,
        context_expander,
        judge,
        followup,
        llm,
        config.clone(),
    );

    let state = HandlerState::new(retrieval, chat, config);
    let app = gateway::create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("synapse shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("SYNAPSE_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{port}/healthz");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
