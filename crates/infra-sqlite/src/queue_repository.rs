// SQLite QueueRepository Implementation

use crate::store::map_sqlx_error;
use async_trait::async_trait;
use qafka_core::domain::{NewQueue, Queue, QueueId};
use qafka_core::error::Result;
use qafka_core::port::QueueRepository;
use sqlx::SqlitePool;

pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert(&self, queue: &NewQueue, now_millis: i64) -> Result<Queue> {
        let row = sqlx::query_as::<_, QueueRow>(
            r#"
            INSERT INTO queues (name, description, queue_type, config, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&queue.name)
        .bind(&queue.description)
        .bind(&queue.queue_type)
        .bind(&queue.config)
        .bind(now_millis)
        .bind(now_millis)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>("SELECT * FROM queues WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<Queue>> {
        let rows: Vec<QueueRow> =
            sqlx::query_as("SELECT * FROM queues ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, queue: &Queue) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE queues
            SET description = ?, queue_type = ?, config = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&queue.description)
        .bind(&queue.queue_type)
        .bind(&queue.config)
        .bind(queue.is_active)
        .bind(queue.updated_at)
        .bind(queue.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: i64,
    name: String,
    description: String,
    queue_type: String,
    config: String,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl From<QueueRow> for Queue {
    fn from(row: QueueRow) -> Self {
        Queue {
            id: row.id,
            name: row.name,
            description: row.description,
            queue_type: row.queue_type,
            config: row.config,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
