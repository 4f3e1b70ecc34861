// SQLite Transaction Implementation

use crate::store::map_sqlx_error;
use async_trait::async_trait;
use qafka_core::domain::{Message, MessageStatus, QueueId, WorkerId, WorkerStatus};
use qafka_core::error::Result;
use qafka_core::port::{StoreTransaction, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};

/// Store transaction; dropping it uncommitted rolls back
pub struct SqliteStoreTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl SqliteStoreTransaction {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transaction for SqliteStoreTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl StoreTransaction for SqliteStoreTransaction {
    async fn update_message_if(
        &mut self,
        message: &Message,
        expected: MessageStatus,
        claimed_by: Option<WorkerId>,
        claimed_at: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = ?, processed_at = ?, failed_at = ?,
                retry_count = ?, error_message = ?, worker_id = ?, updated_at = ?
            WHERE id = ? AND status = ? AND worker_id IS ? AND processed_at IS ?
            "#,
        )
        .bind(message.status.as_str())
        .bind(message.processed_at)
        .bind(message.failed_at)
        .bind(message.retry_count)
        .bind(&message.error_message)
        .bind(message.worker_id)
        .bind(message.updated_at)
        .bind(message.id)
        .bind(expected.as_str())
        .bind(claimed_by)
        .bind(claimed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_worker_counters(
        &mut self,
        worker_id: WorkerId,
        processed: i64,
        failed: i64,
        now_millis: i64,
    ) -> Result<()> {
        // In-place increments: concurrent reports never lose an update
        sqlx::query(
            r#"
            UPDATE workers
            SET processed_count = processed_count + ?,
                failed_count = failed_count + ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(processed)
        .bind(failed)
        .bind(now_millis)
        .bind(worker_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn stop_worker_if_stale(
        &mut self,
        worker_id: WorkerId,
        cutoff_millis: i64,
        now_millis: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE workers
            SET status = ?, updated_at = ?
            WHERE id = ? AND status != ? AND last_ping < ?
            "#,
        )
        .bind(WorkerStatus::Stopped.as_str())
        .bind(now_millis)
        .bind(worker_id)
        .bind(WorkerStatus::Stopped.as_str())
        .bind(cutoff_millis)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_worker_messages(
        &mut self,
        worker_id: WorkerId,
        now_millis: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = ?, processed_at = NULL, worker_id = NULL, updated_at = ?
            WHERE worker_id = ? AND status = ?
            "#,
        )
        .bind(MessageStatus::Pending.as_str())
        .bind(now_millis)
        .bind(worker_id)
        .bind(MessageStatus::Processing.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_workers_of_queue(&mut self, queue_id: QueueId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM workers WHERE queue_id = ?")
            .bind(queue_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count_unfinished_messages(&mut self, queue_id: QueueId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE queue_id = ? AND status IN (?, ?)",
        )
        .bind(queue_id)
        .bind(MessageStatus::Pending.as_str())
        .bind(MessageStatus::Processing.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn delete_finished_messages_of_queue(&mut self, queue_id: QueueId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE queue_id = ? AND status IN (?, ?)")
            .bind(queue_id)
            .bind(MessageStatus::Completed.as_str())
            .bind(MessageStatus::Failed.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_queue(&mut self, queue_id: QueueId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM queues WHERE id = ?")
            .bind(queue_id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}
