// SQLite WorkerRepository Implementation

use crate::store::map_sqlx_error;
use async_trait::async_trait;
use qafka_core::domain::{QueueId, Worker, WorkerId, WorkerStatus};
use qafka_core::error::Result;
use qafka_core::port::WorkerRepository;
use sqlx::SqlitePool;

pub struct SqliteWorkerRepository {
    pool: SqlitePool,
}

impl SqliteWorkerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerRepository for SqliteWorkerRepository {
    async fn insert(&self, worker: &Worker) -> Result<Worker> {
        let row = sqlx::query_as::<_, WorkerRow>(
            r#"
            INSERT INTO workers (
                name, queue_id, status, last_ping,
                processed_count, failed_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&worker.name)
        .bind(worker.queue_id)
        .bind(worker.status.as_str())
        .bind(worker.last_ping)
        .bind(worker.processed_count)
        .bind(worker.failed_count)
        .bind(worker.created_at)
        .bind(worker.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.into_worker()
    }

    async fn find_by_id(&self, id: WorkerId) -> Result<Option<Worker>> {
        let row = sqlx::query_as::<_, WorkerRow>("SELECT * FROM workers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(WorkerRow::into_worker).transpose()
    }

    async fn list(&self, queue_id: Option<QueueId>) -> Result<Vec<Worker>> {
        let rows: Vec<WorkerRow> = sqlx::query_as(
            r#"
            SELECT * FROM workers
            WHERE (? IS NULL OR queue_id = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(queue_id)
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(WorkerRow::into_worker).collect()
    }

    async fn heartbeat(&self, id: WorkerId, status: WorkerStatus, now_millis: i64) -> Result<bool> {
        // Touches only the worker row, never its messages
        let result = sqlx::query(
            "UPDATE workers SET last_ping = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now_millis)
        .bind(status.as_str())
        .bind(now_millis)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_stale(&self, cutoff_millis: i64) -> Result<Vec<Worker>> {
        let rows: Vec<WorkerRow> = sqlx::query_as(
            r#"
            SELECT * FROM workers
            WHERE status != ? AND last_ping < ?
            ORDER BY last_ping ASC
            "#,
        )
        .bind(WorkerStatus::Stopped.as_str())
        .bind(cutoff_millis)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(WorkerRow::into_worker).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WorkerRow {
    id: i64,
    name: String,
    queue_id: i64,
    status: String,
    last_ping: i64,
    processed_count: i64,
    failed_count: i64,
    created_at: i64,
    updated_at: i64,
}

impl WorkerRow {
    fn into_worker(self) -> Result<Worker> {
        Ok(Worker {
            id: self.id,
            name: self.name,
            queue_id: self.queue_id,
            status: self.status.parse()?,
            last_ping: self.last_ping,
            processed_count: self.processed_count,
            failed_count: self.failed_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
