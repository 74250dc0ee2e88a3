//! Process configuration, loaded from `SYNAPSE_*` environment variables.

mod error;
mod presets;

pub use error::ConfigError;
pub use presets::{GenerationPreset, Preset, preset_table};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PORT: &str = "SYNAPSE_PORT";
const ENV_BIND_ADDR: &str = "SYNAPSE_BIND_ADDR";
const ENV_QDRANT_URL: &str = "SYNAPSE_QDRANT_URL";
const ENV_MODEL_PATH: &str = "SYNAPSE_MODEL_PATH";
const ENV_RERANKER_PATH: &str = "SYNAPSE_RERANKER_PATH";
const ENV_EMBEDDING_DIM: &str = "SYNAPSE_EMBEDDING_DIM";

const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// `cache.enabled`, `cache.embedding_ttl`, `cache.search_ttl`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub embedding_ttl: Duration,
    pub search_ttl: Duration,
    pub query_reform_ttl: Duration,
    pub max_entries_per_keyspace: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            embedding_ttl: Duration::from_secs(24 * 3600),
            search_ttl: Duration::from_secs(3600),
            query_reform_ttl: Duration::from_secs(24 * 3600),
            max_entries_per_keyspace: 50_000,
        }
    }
}

/// `rerank.enabled`, `rerank.model`, `rerank.threshold`.
#[derive(Debug, Clone)]
pub struct RerankConfig {
    pub enabled: bool,
    pub model_path: Option<PathBuf>,
    pub threshold: f32,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
            threshold: 0.0,
        }
    }
}

/// `hierarchical.document_multiplier` and the two score floors, kept
/// configurable rather than hard-coded since they were chosen empirically.
#[derive(Debug, Clone)]
pub struct HierarchicalConfig {
    pub document_multiplier: usize,
    pub semantic_score_threshold: f32,
    pub keyword_score_threshold: f32,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            document_multiplier: 3,
            semantic_score_threshold: 0.30,
            keyword_score_threshold: 0.01,
        }
    }
}

/// `context.window_before` (1), `context.window_after` (2).
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    pub window_before: i32,
    pub window_after: i32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_before: 1,
            window_after: 2,
        }
    }
}

/// `graph.enabled`, `graph.working_dir`, `graph.default_mode`, `graph.top_k`,
/// `graph.chunk_top_k`, `graph.rerank_enabled`.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub enabled: bool,
    pub working_dir: PathBuf,
    pub default_mode: String,
    pub top_k: usize,
    pub chunk_top_k: usize,
    pub rerank_enabled: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            working_dir: PathBuf::from("./.data/graph"),
            default_mode: "hybrid".to_string(),
            top_k: 40,
            chunk_top_k: 10,
            rerank_enabled: false,
        }
    }
}

/// `deep_reasoning.max_sub_queries` (3), `deep_reasoning.top_k_per_sub` (5).
#[derive(Debug, Clone, Copy)]
pub struct DeepReasoningConfig {
    pub max_sub_queries: usize,
    pub top_k_per_sub: usize,
}

impl Default for DeepReasoningConfig {
    fn default() -> Self {
        Self {
            max_sub_queries: 3,
            top_k_per_sub: 5,
        }
    }
}

/// `judge.enabled`, `judge.model`, `judge.timeout`.
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub enabled: bool,
    pub model: String,
    pub timeout: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// `llm.provider`, `llm.model`, `llm.temperature`, `llm.max_tokens`, `llm.timeout`.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Exponential-backoff retry policy for upstream calls (see [`crate::retry`]).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Process-wide configuration, assembled once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_addr: String,
    pub qdrant_url: String,
    pub model_path: Option<PathBuf>,
    pub reranker_path: Option<PathBuf>,
    pub embedding_dim: usize,

    pub cache: CacheConfig,
    pub rerank: RerankConfig,
    pub hierarchical: HierarchicalConfig,
    pub context: ContextConfig,
    pub graph: GraphConfig,
    pub deep_reasoning: DeepReasoningConfig,
    pub judge: JudgeConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: "127.0.0.1".to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            model_path: None,
            reranker_path: None,
            embedding_dim: 1536,
            cache: CacheConfig::default(),
            rerank: RerankConfig::default(),
            hierarchical: HierarchicalConfig::default(),
            context: ContextConfig::default(),
            graph: GraphConfig::default(),
            deep_reasoning: DeepReasoningConfig::default(),
            judge: JudgeConfig::default(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// [`Config::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(raw) = std::env::var(ENV_PORT) {
            config.port = raw
                .parse::<u16>()
                .map_err(|source| ConfigError::PortParseError { value: raw, source })?;
        }

        if let Ok(raw) = std::env::var(ENV_BIND_ADDR) {
            config.bind_addr = raw;
        }

        if let Ok(raw) = std::env::var(ENV_QDRANT_URL) {
            config.qdrant_url = raw;
        }

        if let Ok(raw) = std::env::var(ENV_MODEL_PATH) {
            config.model_path = Some(PathBuf::from(raw));
        }

        if let Ok(raw) = std::env::var(ENV_RERANKER_PATH) {
            config.reranker_path = Some(PathBuf::from(raw));
        }

        if let Ok(raw) = std::env::var(ENV_EMBEDDING_DIM) {
            config.embedding_dim = raw
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidPort { value: raw })?;
        }

        Ok(config)
    }

    /// Validates paths that must exist on disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.model_path
            && !path.exists()
        {
            return Err(ConfigError::PathNotFound { path: path.clone() });
        }
        if let Some(path) = &self.reranker_path
            && !path.exists()
        {
            return Err(ConfigError::PathNotFound { path: path.clone() });
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: self.bind_addr.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.hierarchical.document_multiplier, 3);
        assert_eq!(config.context.window_before, 1);
        assert_eq!(config.context.window_after, 2);
        assert_eq!(config.deep_reasoning.max_sub_queries, 3);
        assert_eq!(config.deep_reasoning.top_k_per_sub, 5);
    }

    #[test]
    #[serial]
    fn from_env_overrides_port() {
        unsafe {
            std::env::set_var(ENV_PORT, "9999");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9999);
        unsafe {
            std::env::remove_var(ENV_PORT);
        }
    }

    #[test]
    #[serial]
    fn from_env_rejects_invalid_port() {
        unsafe {
            std::env::set_var(ENV_PORT, "not-a-port");
        }
        let result = Config::from_env();
        assert!(result.is_err());
        unsafe {
            std::env::remove_var(ENV_PORT);
        }
    }
}
