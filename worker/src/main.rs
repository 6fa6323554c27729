use std::sync::Arc;

use async_trait::async_trait;
use chunker::ChunkConfig;
use common::{
    config::EmbeddingProviderKind,
    error::AppError,
    WorkerConfig,
};
use document_renderer::{DocumentRenderer, SummaryGenerator};
use embedder::{Embedder, OllamaEmbedder, OpenAiEmbedder};
use entity_fetcher::HttpEntityFetcher;
use ingestion_pipeline::IngestionPipeline;
use llm_executor::{ExecutorConfig, GeminiProvider, LlmExecutor, Provider, ProviderConfig};
use queue::RedisProcessingQueue;
use store::{DocumentStore, SurrealDbClient, SurrealDocumentStore};
use tokio_util::sync::CancellationToken;
use tracing::info;
use worker::{DebouncedWorker, WorkerTuning};

/// Bridges the executor's `submit` call into the renderer's narrow
/// summary-generation capability.
struct ExecutorSummaryGenerator {
    executor: LlmExecutor,
}

#[async_trait]
impl SummaryGenerator for ExecutorSummaryGenerator {
    async fn summarize(&self, content: &str) -> Result<String, AppError> {
        let prompt = format!(
            "Summarize the following in one sentence:\n\n{content}"
        );
        self.executor.submit(None, &prompt, &CancellationToken::new()).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::logging::init();

    let config = WorkerConfig::from_env()?;

    let queue: Arc<dyn queue::ProcessingQueue> = Arc::new(
        RedisProcessingQueue::new(
            &config.redis_url,
            config.redis_pending_prefix.clone(),
            config.redis_inflight_prefix.clone(),
        )
        .await?,
    );

    let db = SurrealDbClient::connect(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await?;
    db.ensure_indexes(config.embedding_dimension).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(SurrealDocumentStore::new(db));

    let embedder: Arc<dyn Embedder> = match config.embedding_provider {
        EmbeddingProviderKind::Openai => Arc::new(OpenAiEmbedder::new(
            &config.embedding_base_url,
            config.embedding_api_key.as_deref(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )),
        EmbeddingProviderKind::Ollama => Arc::new(OllamaEmbedder::new(
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )),
    };

    let fetcher = Arc::new(HttpEntityFetcher::new(config.authoring_service_base_url.clone()));

    let summary_generator = if config.summaries_enabled() {
        let provider_configs: Vec<ProviderConfig> = config
            .llm_provider_configs_from_env()
            .into_iter()
            .map(|p| ProviderConfig { name: p.name, max_parallel: p.max_parallel, qps: p.qps })
            .collect();
        let gemini_model = config.gemini_model.clone().unwrap_or_else(|| "gemini-1.5-flash".to_string());
        let gemini_api_key = config.gemini_api_key.clone().unwrap_or_default();
        let providers: Vec<Arc<dyn Provider>> =
            vec![Arc::new(GeminiProvider::new("gemini", gemini_model, gemini_api_key))];
        let executor = LlmExecutor::new(
            ExecutorConfig {
                default_provider: config.llm_executor_default_provider.clone(),
                queue_size: config.llm_executor_queue_size,
                providers: provider_configs,
            },
            providers,
        );
        Some(Arc::new(ExecutorSummaryGenerator { executor }) as Arc<dyn SummaryGenerator>)
    } else {
        None
    };

    let renderer = Arc::new(DocumentRenderer::new(summary_generator));
    let pipeline = Arc::new(IngestionPipeline::new(
        fetcher,
        renderer,
        embedder,
        store,
        ChunkConfig::new(config.chunk_max_chars, config.chunk_overlap_chars),
    ));

    let tuning = WorkerTuning {
        debounce_interval: chrono::Duration::minutes(i64::try_from(config.worker_debounce_minutes).unwrap_or(5)),
        poll_interval: std::time::Duration::from_secs(config.worker_poll_seconds),
        batch_size: config.worker_batch_size,
        processing_timeout: chrono::Duration::seconds(
            i64::try_from(config.worker_processing_timeout_seconds).unwrap_or(300),
        ),
    };
    let debounced_worker = DebouncedWorker::new(queue, pipeline, tuning);

    let cancel = CancellationToken::new();
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown_cancel.cancel();
        }
    });

    debounced_worker.run(cancel).await;
    Ok(())
}
