use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{domain::QueueMember, domain::TenantId, error::AppError};

use crate::ProcessingQueue;

#[derive(Default)]
struct TenantPartitions {
    pending: HashMap<QueueMember, DateTime<Utc>>,
    inflight: HashMap<QueueMember, DateTime<Utc>>,
}

/// Pure-Rust double of `ProcessingQueue`, used by component tests that
/// need the exact partition-move contract without a live Redis instance.
/// A single `Mutex` stands in for the atomicity Redis gets from Lua
/// scripts -- every public method takes the lock for its full duration.
#[derive(Default)]
pub struct InMemoryProcessingQueue {
    tenants: Mutex<HashMap<TenantId, TenantPartitions>>,
}

impl InMemoryProcessingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessingQueue for InMemoryProcessingQueue {
    async fn push(
        &self,
        tenant: TenantId,
        member: QueueMember,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        tenants.entry(tenant).or_default().pending.insert(member, at);
        Ok(())
    }

    async fn pop_stable(
        &self,
        tenant: TenantId,
        stable_at: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        let Some(partitions) = tenants.get_mut(&tenant) else {
            return Ok(Vec::new());
        };

        let mut eligible: Vec<(QueueMember, DateTime<Utc>)> = partitions
            .pending
            .iter()
            .filter(|(_, score)| **score <= stable_at)
            .map(|(m, s)| (m.clone(), *s))
            .collect();
        eligible.sort_by_key(|(_, score)| *score);
        eligible.truncate(limit);

        let now = Utc::now();
        let mut moved = Vec::with_capacity(eligible.len());
        for (member, _) in eligible {
            partitions.pending.remove(&member);
            partitions.inflight.insert(member.clone(), now);
            moved.push(member);
        }
        Ok(moved)
    }

    async fn pop_stable_by_prefix(
        &self,
        tenant: TenantId,
        stable_at: DateTime<Utc>,
        limit: usize,
        member_prefix: &str,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        let Some(partitions) = tenants.get_mut(&tenant) else {
            return Ok(Vec::new());
        };

        let mut eligible: Vec<(QueueMember, DateTime<Utc>)> = partitions
            .pending
            .iter()
            .filter(|(m, score)| **score <= stable_at && m.to_string().starts_with(member_prefix))
            .map(|(m, s)| (m.clone(), *s))
            .collect();
        eligible.sort_by_key(|(_, score)| *score);
        eligible.truncate(limit);

        let now = Utc::now();
        let mut moved = Vec::with_capacity(eligible.len());
        for (member, _) in eligible {
            partitions.pending.remove(&member);
            partitions.inflight.insert(member.clone(), now);
            moved.push(member);
        }
        Ok(moved)
    }

    async fn ack(&self, tenant: TenantId, member: &QueueMember) -> Result<(), AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        if let Some(partitions) = tenants.get_mut(&tenant) {
            partitions.inflight.remove(member);
        }
        Ok(())
    }

    async fn release(
        &self,
        tenant: TenantId,
        member: QueueMember,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        let partitions = tenants.entry(tenant).or_default();
        partitions.inflight.remove(&member);
        partitions.pending.insert(member, at);
        Ok(())
    }

    async fn requeue_expired(
        &self,
        tenant: TenantId,
        expired_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        let Some(partitions) = tenants.get_mut(&tenant) else {
            return Ok(Vec::new());
        };

        let mut eligible: Vec<(QueueMember, DateTime<Utc>)> = partitions
            .inflight
            .iter()
            .filter(|(_, score)| **score <= expired_before)
            .map(|(m, s)| (m.clone(), *s))
            .collect();
        eligible.sort_by_key(|(_, score)| *score);
        eligible.truncate(limit);

        let now = Utc::now();
        let mut moved = Vec::with_capacity(eligible.len());
        for (member, _) in eligible {
            partitions.inflight.remove(&member);
            partitions.pending.insert(member.clone(), now);
            moved.push(member);
        }
        Ok(moved)
    }

    async fn remove(&self, tenant: TenantId, member: &QueueMember) -> Result<(), AppError> {
        let mut tenants = self.tenants.lock().expect("queue mutex poisoned");
        if let Some(partitions) = tenants.get_mut(&tenant) {
            partitions.pending.remove(member);
            partitions.inflight.remove(member);
        }
        Ok(())
    }

    async fn list_tenants_with_pending(&self) -> Result<Vec<TenantId>, AppError> {
        let tenants = self.tenants.lock().expect("queue mutex poisoned");
        Ok(tenants
            .iter()
            .filter(|(_, p)| !p.pending.is_empty())
            .map(|(t, _)| *t)
            .collect())
    }

    async fn list_tenants_with_inflight(&self) -> Result<Vec<TenantId>, AppError> {
        let tenants = self.tenants.lock().expect("queue mutex poisoned");
        Ok(tenants
            .iter()
            .filter(|(_, p)| !p.inflight.is_empty())
            .map(|(t, _)| *t)
            .collect())
    }
}
