use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use common::error::AppError;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{rate_interval, Job, Provider, ProviderConfig};

fn cancelled_error() -> AppError {
    AppError::Internal("request cancelled".to_string())
}

/// Paces dispatch so that no two calls start within `1/qps` seconds.
/// `None` interval means unpaced.
struct RateLimiter {
    interval: Option<Duration>,
    next_allowed: StdMutex<Instant>,
}

impl RateLimiter {
    fn new(qps: f64) -> Self {
        Self {
            interval: rate_interval(qps),
            next_allowed: StdMutex::new(Instant::now()),
        }
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), AppError> {
        if cancel.is_cancelled() {
            return Err(cancelled_error());
        }
        let Some(interval) = self.interval else {
            return Ok(());
        };

        let wait = {
            let mut next = self.next_allowed.lock().expect("rate limiter mutex poisoned");
            let now = Instant::now();
            let scheduled = if *next > now { *next } else { now };
            *next = scheduled + interval;
            scheduled.saturating_duration_since(now)
        };

        if wait.is_zero() {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(wait) => Ok(()),
            () = cancel.cancelled() => Err(cancelled_error()),
        }
    }
}

/// A single provider's worker group: a shared inbox behind an async mutex
/// (only one worker pulls the next job at a time) and a rate limiter
/// shared across all `max_parallel` workers.
pub struct ProviderPool {
    name: String,
    _workers: JoinSet<()>,
}

impl ProviderPool {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns `config.max_parallel` worker tasks pulling from a bounded
    /// inbox of size `config.queue_size` analog (the admission channel
    /// itself lives in the caller; this is the per-pool processing side).
    pub fn spawn(
        config: ProviderConfig,
        provider: Arc<dyn Provider>,
    ) -> (Arc<Self>, mpsc::Sender<Job>) {
        let queue_size = config.max_parallel.max(1) * 4;
        let (tx, rx) = mpsc::channel::<Job>(queue_size.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let limiter = Arc::new(RateLimiter::new(config.qps));

        let mut workers = JoinSet::new();
        for worker_index in 0..config.max_parallel.max(1) {
            let rx = rx.clone();
            let limiter = limiter.clone();
            let provider = provider.clone();
            let provider_name = config.name.clone();
            workers.spawn(async move {
                loop {
                    let job = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(job) = job else {
                        debug!(provider = %provider_name, worker_index, "inbox closed, worker exiting");
                        break;
                    };

                    if job.cancel.is_cancelled() {
                        let _ = job.reply.send(Err(cancelled_error()));
                        continue;
                    }

                    if let Err(err) = limiter.acquire(&job.cancel).await {
                        let _ = job.reply.send(Err(err));
                        continue;
                    }

                    if job.cancel.is_cancelled() {
                        let _ = job.reply.send(Err(cancelled_error()));
                        continue;
                    }

                    let result = provider.generate(&job.cancel, &job.prompt).await;
                    if let Err(err) = &result {
                        warn!(provider = %provider_name, worker_index, error = %err, "provider call failed");
                    }
                    let _ = job.reply.send(result);
                }
            });
        }

        let pool = Arc::new(Self {
            name: config.name,
            _workers: workers,
        });
        (pool, tx)
    }
}
