// Store housekeeping port: GC of finished messages, compaction, size stats
use crate::error::Result;
use async_trait::async_trait;

/// Point-in-time store statistics
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceStats {
    pub db_size_bytes: i64,
    pub db_size_mb: f64,
    pub queue_count: i64,
    pub message_count: i64,
    /// `completed` + `failed`, the rows GC may collect
    pub finished_message_count: i64,
    pub worker_count: i64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Terminal messages untouched for longer than this are deleted
    pub finished_message_retention_days: i64,

    /// Compact only above this size (MB)
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            finished_message_retention_days: 7,
            max_db_size_mb: 1000.0,
        }
    }
}

/// Result of one maintenance pass
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceReport {
    pub deleted_messages: i64,
    /// `None` when compaction was skipped
    pub reclaimed_mb: Option<f64>,
    pub stats: MaintenanceStats,
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Compact the store, returning MB reclaimed
    async fn vacuum(&self) -> Result<f64>;

    /// Delete `completed`/`failed` messages last updated before the
    /// retention window. Pending and processing rows are never touched.
    async fn gc_finished_messages(&self, retention_days: i64) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// GC, then compact if the store is oversized
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceReport> {
        let deleted_messages = self
            .gc_finished_messages(config.finished_message_retention_days)
            .await?;

        let size_mb = self.get_stats().await?.db_size_mb;
        let reclaimed_mb = if size_mb > config.max_db_size_mb {
            Some(self.vacuum().await?)
        } else {
            None
        };

        Ok(MaintenanceReport {
            deleted_messages,
            reclaimed_mb,
            stats: self.get_stats().await?,
        })
    }
}
