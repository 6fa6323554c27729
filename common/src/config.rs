use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Embedding provider selection, mirrors `EMBEDDING_PROVIDER`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Openai,
    Ollama,
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Ollama
}

fn default_embedding_dimension() -> usize {
    768
}

fn default_chunk_max_chars() -> usize {
    2000
}

fn default_chunk_overlap_chars() -> usize {
    200
}

fn default_debounce_minutes() -> u64 {
    5
}

fn default_poll_seconds() -> u64 {
    10
}

fn default_batch_size() -> usize {
    50
}

fn default_processing_timeout_seconds() -> u64 {
    300
}

fn default_llm_queue_size() -> usize {
    64
}

fn default_redis_pending_prefix() -> String {
    "ingestion:queue".to_string()
}

fn default_redis_inflight_prefix() -> String {
    "ingestion:processing".to_string()
}

/// One provider pool declaration, parsed from `LLM_EXECUTOR_PROVIDERS`
/// plus per-provider `LLM_EXECUTOR_<NAME>_MAX_PARALLEL` / `_QPS`.
#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
    pub name: String,
    pub max_parallel: usize,
    pub qps: f64,
}

/// Process-wide configuration, loaded from the environment.
///
/// A single struct populated via `config::Config` with `Environment` as
/// the only source, `serde(default = ...)` covering every optional field.
#[derive(Clone, Debug, Deserialize)]
pub struct WorkerConfig {
    pub redis_url: String,
    #[serde(default = "default_redis_pending_prefix")]
    pub redis_pending_prefix: String,
    #[serde(default = "default_redis_inflight_prefix")]
    pub redis_inflight_prefix: String,

    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,

    pub authoring_service_base_url: String,

    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: EmbeddingProviderKind,
    #[serde(default)]
    pub embedding_model: String,
    #[serde(default = "default_embedding_base_url")]
    pub embedding_base_url: String,
    #[serde(default)]
    pub embedding_api_key: Option<String>,
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default = "default_chunk_overlap_chars")]
    pub chunk_overlap_chars: usize,

    #[serde(default = "default_debounce_minutes")]
    pub worker_debounce_minutes: u64,
    #[serde(default = "default_poll_seconds")]
    pub worker_poll_seconds: u64,
    #[serde(default = "default_batch_size")]
    pub worker_batch_size: usize,
    #[serde(default = "default_processing_timeout_seconds")]
    pub worker_processing_timeout_seconds: u64,

    #[serde(default = "default_llm_queue_size")]
    pub llm_executor_queue_size: usize,
    /// Comma-separated provider names; per-provider tuning is folded in by
    /// `WorkerConfig::llm_provider_configs`, which re-reads the raw env.
    #[serde(default)]
    pub llm_executor_providers: String,
    #[serde(default)]
    pub llm_executor_default_provider: String,

    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: Option<String>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError` when a required key is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Environment::default())
            .build()?;

        config.try_deserialize()
    }

    /// Parses the per-provider `LLM_EXECUTOR_<NAME>_MAX_PARALLEL` /
    /// `LLM_EXECUTOR_<NAME>_QPS` variables for every name listed in
    /// `llm_executor_providers`. Absent a concrete env backend in tests,
    /// callers build this list directly for unit tests.
    #[must_use]
    pub fn llm_provider_configs_from_env(&self) -> Vec<LlmProviderConfig> {
        self.llm_executor_providers
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                let upper = name.to_uppercase();
                let max_parallel = std::env::var(format!("LLM_EXECUTOR_{upper}_MAX_PARALLEL"))
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                let qps = std::env::var(format!("LLM_EXECUTOR_{upper}_QPS"))
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0);
                LlmProviderConfig {
                    name: name.to_string(),
                    max_parallel,
                    qps,
                }
            })
            .collect()
    }

    /// `true` when a summary generator should be constructed.
    #[must_use]
    pub fn summaries_enabled(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}
