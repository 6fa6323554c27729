//! Poll loop over the debounced queue: claim stable items, dispatch them
//! through one ingestion use case, ack or release, and periodically
//! recover in-flight items abandoned by a crashed worker (C9).

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{
    domain::{QueueMember, TenantId},
    error::AppError,
};
use ingestion_pipeline::IngestionPipeline;
use queue::ProcessingQueue;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Tuning for the poll loop, mirroring spec.md's `{debounce_interval,
/// poll_interval, batch_size, processing_timeout}`.
#[derive(Debug, Clone, Copy)]
pub struct WorkerTuning {
    pub debounce_interval: ChronoDuration,
    pub poll_interval: std::time::Duration,
    pub batch_size: usize,
    pub processing_timeout: ChronoDuration,
}

pub struct DebouncedWorker {
    queue: Arc<dyn ProcessingQueue>,
    pipeline: Arc<IngestionPipeline>,
    tuning: WorkerTuning,
}

impl DebouncedWorker {
    #[must_use]
    pub fn new(queue: Arc<dyn ProcessingQueue>, pipeline: Arc<IngestionPipeline>, tuning: WorkerTuning) -> Self {
        Self { queue, pipeline, tuning }
    }

    /// Runs until `cancel` fires. Each tick completes its outstanding
    /// dispatches before the cancellation is observed (best effort);
    /// only the inter-tick sleep is interrupted promptly.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("ingestion worker loop starting");
        while !cancel.is_cancelled() {
            if let Err(err) = self.process_stable().await {
                error!(error = %err, "process_stable failed");
            }
            if let Err(err) = self.recover_expired().await {
                error!(error = %err, "visibility-timeout recovery failed");
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.tuning.poll_interval) => {}
            }
        }
        info!("ingestion worker loop exited");
    }

    /// One pass: every tenant with pending work past its debounce window
    /// gets its stable items popped and dispatched. Items within and
    /// across tenants are dispatched concurrently; the queue's pop/ack
    /// protocol is the only exclusion mechanism required.
    #[instrument(skip_all)]
    pub async fn process_stable(&self) -> Result<(), AppError> {
        let stable_at = Utc::now() - self.tuning.debounce_interval;
        let tenants = self.queue.list_tenants_with_pending().await?;

        let mut dispatches = JoinSet::new();
        for tenant in tenants {
            let items = self
                .queue
                .pop_stable(tenant, stable_at, self.tuning.batch_size)
                .await?;
            for member in items {
                let pipeline = Arc::clone(&self.pipeline);
                let queue = Arc::clone(&self.queue);
                dispatches.spawn(async move {
                    dispatch(pipeline.as_ref(), queue.as_ref(), tenant, member).await;
                });
            }
        }

        while let Some(result) = dispatches.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "dispatch task panicked");
            }
        }
        Ok(())
    }

    /// Requeues in-flight items whose processing deadline has passed,
    /// once per tenant that currently has any.
    #[instrument(skip_all)]
    pub async fn recover_expired(&self) -> Result<(), AppError> {
        let expired_before = Utc::now() - self.tuning.processing_timeout;
        let tenants = self.queue.list_tenants_with_inflight().await?;

        for tenant in tenants {
            let recovered = self
                .queue
                .requeue_expired(tenant, expired_before, self.tuning.batch_size)
                .await?;
            if !recovered.is_empty() {
                warn!(
                    tenant = %tenant,
                    count = recovered.len(),
                    "requeued in-flight items past their processing timeout"
                );
            }
        }
        Ok(())
    }
}

#[instrument(skip(pipeline, queue), fields(tenant = %tenant, member = %member))]
async fn dispatch(pipeline: &IngestionPipeline, queue: &dyn ProcessingQueue, tenant: TenantId, member: QueueMember) {
    let release_at: DateTime<Utc> = Utc::now();
    match pipeline.execute(tenant, &member).await {
        Ok(outcome) => {
            info!(outcome = ?outcome, "ingestion dispatch succeeded");
            if let Err(err) = queue.ack(tenant, &member).await {
                error!(error = %err, "failed to ack a successfully processed item");
            }
        }
        Err(err) => {
            warn!(error = %err, retryable = err.is_retryable(), "ingestion dispatch failed");
            if let Err(release_err) = queue.release(tenant, member, release_at).await {
                error!(error = %release_err, "failed to release a failed item back to pending");
            }
        }
    }
}
