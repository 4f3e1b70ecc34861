// SQLite Maintenance Implementation
use crate::store::map_sqlx_error;
use async_trait::async_trait;
use qafka_core::domain::MessageStatus;
use qafka_core::error::{AppError, Result};
use qafka_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// DB size in bytes (page_count * page_size)
    async fn get_db_size_bytes(&self) -> Result<i64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page count: {}", e)))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get page size: {}", e)))?;

        Ok(page_count * page_size)
    }
}

fn to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("Running VACUUM to optimize database...");

        let size_before = to_mb(self.get_db_size_bytes().await?);

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let size_after = to_mb(self.get_db_size_bytes().await?);
        let reclaimed = (size_before - size_after).max(0.0);

        info!(
            size_before_mb = size_before,
            size_after_mb = size_after,
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn gc_finished_messages(&self, retention_days: i64) -> Result<i64> {
        let cutoff = self.time_provider.now_millis() - retention_days * MILLIS_PER_DAY;

        // Terminal rows only; pending/processing are never collected
        let result = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE status IN (?, ?)
            AND updated_at < ?
            "#,
        )
        .bind(MessageStatus::Completed.as_str())
        .bind(MessageStatus::Failed.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() as i64;
        info!(
            retention_days = retention_days,
            cutoff = cutoff,
            deleted_messages = deleted,
            "Finished message GC completed"
        );

        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let db_size_bytes = self.get_db_size_bytes().await?;

        let queue_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queues")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let message_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let finished_message_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE status IN (?, ?)")
                .bind(MessageStatus::Completed.as_str())
                .bind(MessageStatus::Failed.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let worker_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(MaintenanceStats {
            db_size_bytes,
            db_size_mb: to_mb(db_size_bytes),
            queue_count,
            message_count,
            finished_message_count,
            worker_count,
        })
    }
}
