use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{domain::QueueMember, domain::TenantId, error::AppError};
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use tracing::{debug, warn};

use crate::ProcessingQueue;

/// `ZADD` the member, then track the tenant in the pending-tenants set.
const PUSH_SCRIPT: &str = r"
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[2])
redis.call('SADD', KEYS[2], ARGV[3])
return 1
";

/// Move up to `limit` pending members with score <= stable_at into
/// in-flight, rescored to now.
const POP_STABLE_SCRIPT: &str = r"
local members = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[2])
if #members == 0 then
  return {}
end
for i, m in ipairs(members) do
  redis.call('ZREM', KEYS[1], m)
  redis.call('ZADD', KEYS[2], ARGV[3], m)
end
redis.call('SADD', KEYS[4], ARGV[4])
if redis.call('ZCARD', KEYS[1]) == 0 then
  redis.call('SREM', KEYS[3], ARGV[4])
end
return members
";

/// As `POP_STABLE_SCRIPT`, but full-scans the stable candidates and keeps
/// only those whose member string begins with the given prefix. A
/// prefix-indexed variant would avoid the scan but isn't worth the extra
/// bookkeeping at current partition sizes.
const POP_STABLE_BY_PREFIX_SCRIPT: &str = r"
local candidates = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
local limit = tonumber(ARGV[2])
local prefix = ARGV[5]
local plen = string.len(prefix)
local matched = {}
for i, m in ipairs(candidates) do
  if #matched >= limit then
    break
  end
  if string.sub(m, 1, plen) == prefix then
    table.insert(matched, m)
  end
end
for i, m in ipairs(matched) do
  redis.call('ZREM', KEYS[1], m)
  redis.call('ZADD', KEYS[2], ARGV[3], m)
end
if #matched > 0 then
  redis.call('SADD', KEYS[4], ARGV[4])
end
if redis.call('ZCARD', KEYS[1]) == 0 then
  redis.call('SREM', KEYS[3], ARGV[4])
end
return matched
";

const ACK_SCRIPT: &str = r"
redis.call('ZREM', KEYS[1], ARGV[1])
if redis.call('ZCARD', KEYS[1]) == 0 then
  redis.call('SREM', KEYS[2], ARGV[2])
end
return 1
";

const RELEASE_SCRIPT: &str = r"
redis.call('ZREM', KEYS[2], ARGV[1])
redis.call('ZADD', KEYS[1], ARGV[2], ARGV[1])
redis.call('SADD', KEYS[3], ARGV[3])
if redis.call('ZCARD', KEYS[2]) == 0 then
  redis.call('SREM', KEYS[4], ARGV[3])
end
return 1
";

/// Same shape as `POP_STABLE_SCRIPT` but moving in-flight -> pending.
const REQUEUE_EXPIRED_SCRIPT: &str = r"
local members = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, ARGV[2])
if #members == 0 then
  return {}
end
for i, m in ipairs(members) do
  redis.call('ZREM', KEYS[1], m)
  redis.call('ZADD', KEYS[2], ARGV[3], m)
end
redis.call('SADD', KEYS[4], ARGV[4])
if redis.call('ZCARD', KEYS[1]) == 0 then
  redis.call('SREM', KEYS[3], ARGV[4])
end
return members
";

const REMOVE_SCRIPT: &str = r"
redis.call('ZREM', KEYS[1], ARGV[1])
redis.call('ZREM', KEYS[2], ARGV[1])
if redis.call('ZCARD', KEYS[1]) == 0 then
  redis.call('SREM', KEYS[3], ARGV[2])
end
if redis.call('ZCARD', KEYS[2]) == 0 then
  redis.call('SREM', KEYS[4], ARGV[2])
end
return 1
";

/// Redis-backed `ProcessingQueue`. Keys are `"{prefix}:{tenant}"` sorted
/// sets; membership in each partition is additionally tracked in a
/// `"{prefix}:tenants"` set so `list_tenants_with_*` doesn't require a
/// `SCAN` over the whole keyspace.
pub struct RedisProcessingQueue {
    manager: ConnectionManager,
    pending_prefix: String,
    inflight_prefix: String,
}

impl RedisProcessingQueue {
    /// Connects to `redis_url` and builds the auto-reconnecting connection
    /// manager used for every subsequent operation.
    ///
    /// # Errors
    /// Returns `AppError::Redis` if the initial connection fails.
    pub async fn new(
        redis_url: &str,
        pending_prefix: impl Into<String>,
        inflight_prefix: impl Into<String>,
    ) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            manager,
            pending_prefix: pending_prefix.into(),
            inflight_prefix: inflight_prefix.into(),
        })
    }

    fn pending_key(&self, tenant: TenantId) -> String {
        format!("{}:{}", self.pending_prefix, tenant)
    }

    fn inflight_key(&self, tenant: TenantId) -> String {
        format!("{}:{}", self.inflight_prefix, tenant)
    }

    fn pending_tenants_key(&self) -> String {
        format!("{}:tenants", self.pending_prefix)
    }

    fn inflight_tenants_key(&self) -> String {
        format!("{}:tenants", self.inflight_prefix)
    }

    fn parse_members(raw: Vec<String>) -> Vec<QueueMember> {
        raw.into_iter()
            .filter_map(|m| match m.parse() {
                Ok(member) => Some(member),
                Err(err) => {
                    warn!(member = %m, error = %err, "dropping malformed queue member from redis");
                    None
                }
            })
            .collect()
    }

    fn parse_tenants(raw: Vec<String>) -> Vec<TenantId> {
        raw.into_iter()
            .filter_map(|t| match t.parse() {
                Ok(tenant) => Some(tenant),
                Err(err) => {
                    warn!(tenant = %t, error = %err, "dropping malformed tenant id from redis");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl ProcessingQueue for RedisProcessingQueue {
    async fn push(
        &self,
        tenant: TenantId,
        member: QueueMember,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        Script::new(PUSH_SCRIPT)
            .key(self.pending_key(tenant))
            .key(self.pending_tenants_key())
            .arg(at.timestamp())
            .arg(member.to_string())
            .arg(tenant.to_string())
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn pop_stable(
        &self,
        tenant: TenantId,
        stable_at: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = Script::new(POP_STABLE_SCRIPT)
            .key(self.pending_key(tenant))
            .key(self.inflight_key(tenant))
            .key(self.pending_tenants_key())
            .key(self.inflight_tenants_key())
            .arg(stable_at.timestamp())
            .arg(limit)
            .arg(Utc::now().timestamp())
            .arg(tenant.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(Self::parse_members(raw))
    }

    async fn pop_stable_by_prefix(
        &self,
        tenant: TenantId,
        stable_at: DateTime<Utc>,
        limit: usize,
        member_prefix: &str,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = Script::new(POP_STABLE_BY_PREFIX_SCRIPT)
            .key(self.pending_key(tenant))
            .key(self.inflight_key(tenant))
            .key(self.pending_tenants_key())
            .key(self.inflight_tenants_key())
            .arg(stable_at.timestamp())
            .arg(limit)
            .arg(Utc::now().timestamp())
            .arg(tenant.to_string())
            .arg(member_prefix)
            .invoke_async(&mut conn)
            .await?;
        Ok(Self::parse_members(raw))
    }

    async fn ack(&self, tenant: TenantId, member: &QueueMember) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        Script::new(ACK_SCRIPT)
            .key(self.inflight_key(tenant))
            .key(self.inflight_tenants_key())
            .arg(member.to_string())
            .arg(tenant.to_string())
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        debug!(%tenant, %member, "acked queue item");
        Ok(())
    }

    async fn release(
        &self,
        tenant: TenantId,
        member: QueueMember,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        Script::new(RELEASE_SCRIPT)
            .key(self.pending_key(tenant))
            .key(self.inflight_key(tenant))
            .key(self.pending_tenants_key())
            .key(self.inflight_tenants_key())
            .arg(member.to_string())
            .arg(at.timestamp())
            .arg(tenant.to_string())
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn requeue_expired(
        &self,
        tenant: TenantId,
        expired_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QueueMember>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = Script::new(REQUEUE_EXPIRED_SCRIPT)
            .key(self.inflight_key(tenant))
            .key(self.pending_key(tenant))
            .key(self.inflight_tenants_key())
            .key(self.pending_tenants_key())
            .arg(expired_before.timestamp())
            .arg(limit)
            .arg(Utc::now().timestamp())
            .arg(tenant.to_string())
            .invoke_async(&mut conn)
            .await?;
        Ok(Self::parse_members(raw))
    }

    async fn remove(&self, tenant: TenantId, member: &QueueMember) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        Script::new(REMOVE_SCRIPT)
            .key(self.pending_key(tenant))
            .key(self.inflight_key(tenant))
            .key(self.pending_tenants_key())
            .key(self.inflight_tenants_key())
            .arg(member.to_string())
            .arg(tenant.to_string())
            .invoke_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_tenants_with_pending(&self) -> Result<Vec<TenantId>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = conn.smembers(self.pending_tenants_key()).await?;
        Ok(Self::parse_tenants(raw))
    }

    async fn list_tenants_with_inflight(&self) -> Result<Vec<TenantId>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Vec<String> = conn.smembers(self.inflight_tenants_key()).await?;
        Ok(Self::parse_tenants(raw))
    }
}
