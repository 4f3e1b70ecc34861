// SQLite MessageRepository Implementation

use crate::store::map_sqlx_error;
use async_trait::async_trait;
use qafka_core::domain::{Message, MessageId, MessageStatus, QueueId, WorkerId, WorkerStatus};
use qafka_core::error::Result;
use qafka_core::port::MessageRepository;
use sqlx::SqlitePool;

pub struct SqliteMessageRepository {
    pool: SqlitePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (
                queue_id, payload, priority, status,
                scheduled_at, processed_at, failed_at,
                retry_count, max_retries, error_message, worker_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(message.queue_id)
        .bind(&message.payload)
        .bind(message.priority)
        .bind(message.status.as_str())
        .bind(message.scheduled_at)
        .bind(message.processed_at)
        .bind(message.failed_at)
        .bind(message.retry_count)
        .bind(message.max_retries)
        .bind(&message.error_message)
        .bind(message.worker_id)
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.into_message()
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(MessageRow::into_message).transpose()
    }

    async fn list(&self, queue_id: Option<QueueId>, limit: Option<i64>) -> Result<Vec<Message>> {
        // LIMIT -1 is unbounded in SQLite
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE (? IS NULL OR queue_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(queue_id)
        .bind(queue_id)
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    async fn find_next_eligible(
        &self,
        queue_id: QueueId,
        now_millis: i64,
    ) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT * FROM messages
            WHERE queue_id = ? AND status = ?
              AND (scheduled_at IS NULL OR scheduled_at <= ?)
            ORDER BY priority DESC, created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(queue_id)
        .bind(MessageStatus::Pending.as_str())
        .bind(now_millis)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(MessageRow::into_message).transpose()
    }

    async fn try_claim(
        &self,
        id: MessageId,
        worker_id: Option<WorkerId>,
        now_millis: i64,
    ) -> Result<bool> {
        // Conditional on status: a concurrent winner makes this a no-op
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = ?, processed_at = ?, worker_id = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(MessageStatus::Processing.as_str())
        .bind(now_millis)
        .bind(worker_id)
        .bind(now_millis)
        .bind(id)
        .bind(MessageStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn count_by_status(&self, queue_id: QueueId, status: MessageStatus) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE queue_id = ? AND status = ?")
                .bind(queue_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(count)
    }

    async fn release_unowned_before(&self, cutoff_millis: i64, now_millis: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = ?, processed_at = NULL, updated_at = ?
            WHERE status = ? AND worker_id IS NULL AND processed_at < ?
            "#,
        )
        .bind(MessageStatus::Pending.as_str())
        .bind(now_millis)
        .bind(MessageStatus::Processing.as_str())
        .bind(cutoff_millis)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn release_held_by_stopped(&self, now_millis: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = ?, processed_at = NULL, worker_id = NULL, updated_at = ?
            WHERE status = ?
              AND worker_id IN (SELECT id FROM workers WHERE status = ?)
            "#,
        )
        .bind(MessageStatus::Pending.as_str())
        .bind(now_millis)
        .bind(MessageStatus::Processing.as_str())
        .bind(WorkerStatus::Stopped.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    queue_id: i64,
    payload: String,
    priority: i32,
    status: String,
    scheduled_at: Option<i64>,
    processed_at: Option<i64>,
    failed_at: Option<i64>,
    retry_count: i32,
    max_retries: i32,
    error_message: Option<String>,
    worker_id: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: self.id,
            queue_id: self.queue_id,
            payload: self.payload,
            priority: self.priority,
            status: self.status.parse()?,
            scheduled_at: self.scheduled_at,
            processed_at: self.processed_at,
            failed_at: self.failed_at,
            retry_count: self.retry_count,
            max_retries: self.max_retries,
            error_message: self.error_message,
            worker_id: self.worker_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
