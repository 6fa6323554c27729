//! Bounded-concurrency, per-provider rate-limited dispatcher (C2) used by
//! the optional summary-generation step of the document renderer.

mod gemini;
mod pool;

pub use gemini::GeminiProvider;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::error::AppError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pool::ProviderPool;

/// A named, callable text generator. The only concrete implementation
/// shipped here is [`GeminiProvider`]; others can be registered by a
/// caller that builds its own `Provider`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, cancel: &CancellationToken, prompt: &str) -> Result<String, AppError>;
}

/// Per-provider pool sizing and pacing.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub max_parallel: usize,
    pub qps: f64,
}

/// Construction inputs for [`LlmExecutor::new`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub default_provider: String,
    pub queue_size: usize,
    pub providers: Vec<ProviderConfig>,
}

pub(crate) struct Job {
    pub(crate) prompt: String,
    pub(crate) cancel: CancellationToken,
    pub(crate) reply: oneshot::Sender<Result<String, AppError>>,
}

/// In-process scheduler: one bounded admission channel per provider pool,
/// `max_parallel` worker tasks per pool, and an optional QPS-paced token
/// source gating each pool's dispatch rate.
pub struct LlmExecutor {
    default_provider: String,
    senders: HashMap<String, mpsc::Sender<Job>>,
    _pools: Vec<Arc<ProviderPool>>,
}

impl LlmExecutor {
    /// Spawns one pool per entry in `config.providers`, wiring the ones
    /// whose name matches a handle in `providers`. A configured provider
    /// with no matching handle is skipped with a warning -- it becomes an
    /// `UnknownProvider` at submit time instead of a construction error,
    /// matching the shape of a live config/handle mismatch the worker may
    /// recover from by reloading config.
    #[must_use]
    pub fn new(config: ExecutorConfig, providers: Vec<Arc<dyn Provider>>) -> Self {
        let mut handles: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        for provider in providers {
            handles.insert(provider.name().to_string(), provider);
        }

        let mut senders = HashMap::new();
        let mut pools = Vec::new();
        for provider_config in config.providers {
            let Some(handle) = handles.remove(&provider_config.name) else {
                warn!(provider = %provider_config.name, "no Provider handle registered for configured pool");
                continue;
            };
            let (pool, sender) = ProviderPool::spawn(provider_config, handle);
            senders.insert(pool.name().to_string(), sender);
            pools.push(pool);
        }

        Self {
            default_provider: config.default_provider,
            senders,
            _pools: pools,
        }
    }

    /// Submits `prompt` to `provider` (or the default provider when
    /// `provider` is `None`, empty, or `"auto"` in any casing) and awaits
    /// its result.
    ///
    /// Fails fast with `QueueFull` when the pool's admission channel is
    /// saturated, and with `UnknownProvider` when no pool answers to the
    /// resolved name. `cancel` is observed both before a worker acquires a
    /// rate-limit token and again before it calls `generate`.
    pub async fn submit(
        &self,
        provider: Option<&str>,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AppError> {
        let provider_name = provider
            .map(str::to_lowercase)
            .filter(|p| !p.is_empty() && p != "auto")
            .unwrap_or_else(|| self.default_provider.clone());
        let sender = self
            .senders
            .get(&provider_name)
            .ok_or_else(|| AppError::UnknownProvider(provider_name.clone()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            prompt: prompt.to_string(),
            cancel: cancel.clone(),
            reply: reply_tx,
        };

        sender
            .try_send(job)
            .map_err(|_| AppError::QueueFull)?;

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(provider = %provider_name, "submit cancelled while awaiting reply");
                Err(AppError::Internal("request cancelled".to_string()))
            }
            result = reply_rx => result.map_err(|_| AppError::Internal("executor worker dropped reply channel".to_string()))?,
        }
    }
}

/// Minimum spacing between dispatched calls for a pool paced at `qps`
/// requests per second, or `None` when unpaced.
pub(crate) fn rate_interval(qps: f64) -> Option<Duration> {
    if qps > 0.0 {
        Some(Duration::from_secs_f64(1.0 / qps))
    } else {
        None
    }
}
