use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use paycontrol_core::{AuditEntry, AuditLog, AuditQuery};
use redis::{AsyncCommands, Client};
use serde::Serialize;
use tracing::warn;

pub const AUDIT_CHANNEL: &str = "paycontrol.audit";

#[derive(Clone)]
pub struct RedisBus {
    client: Client,
}

impl RedisBus {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    pub async fn publish_json<T: Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let serialized = serde_json::to_string(payload)?;
        let _: i64 = connection.publish(channel, serialized).await?;
        Ok(())
    }
}

/// Audit log that also announces each stored entry on [`AUDIT_CHANNEL`].
/// The durable write decides success; a failed publish is only logged.
pub struct PublishingAuditLog {
    inner: Arc<dyn AuditLog>,
    bus: RedisBus,
}

impl PublishingAuditLog {
    pub fn new(inner: Arc<dyn AuditLog>, bus: RedisBus) -> Self {
        Self { inner, bus }
    }
}

#[async_trait]
impl AuditLog for PublishingAuditLog {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.inner.record(entry).await?;

        if let Err(err) = self.bus.publish_json(AUDIT_CHANNEL, entry).await {
            warn!(
                audit_id = %entry.id,
                error = %err,
                "failed to publish audit entry"
            );
        }

        Ok(())
    }

    async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        self.inner.list(query).await
    }
}
