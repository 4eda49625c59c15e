use crate::domain::ports::{AuditCategory, AuditLog, LogDestination};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Ships audit entries as `tracing` events on the `audit` target.
///
/// Route them with a subscriber filter such as `RUST_LOG=audit=info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn record(
        &self,
        message: &str,
        category: AuditCategory,
        destination: LogDestination,
    ) -> Result<()> {
        info!(target: "audit", %category, %destination, "{message}");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub message: String,
    pub category: AuditCategory,
    pub destination: LogDestination,
    pub recorded_at: DateTime<Utc>,
}

/// Keeps audit entries in memory so tests can inspect them.
#[derive(Default, Clone)]
pub struct MemoryAuditLog {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn entries_in(&self, category: AuditCategory) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(
        &self,
        message: &str,
        category: AuditCategory,
        destination: LogDestination,
    ) -> Result<()> {
        self.entries.write().await.push(AuditEntry {
            message: message.to_string(),
            category,
            destination,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_audit_log_filters_by_category() {
        let log = MemoryAuditLog::new();
        log.record("approved", AuditCategory::AdminEvent, LogDestination::Admin)
            .await
            .unwrap();
        log.record("refunded", AuditCategory::RefundEvent, LogDestination::Payments)
            .await
            .unwrap();

        let admin = log.entries_in(AuditCategory::AdminEvent).await;
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].destination, LogDestination::Admin);
        assert_eq!(log.entries().await.len(), 2);
    }
}
