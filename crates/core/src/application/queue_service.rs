// Queue Registry - CRUD over queue definitions

use crate::application::worker::constants::MAX_QUEUE_NAME_LEN;
use crate::domain::{NewQueue, Queue, QueueId, QueueUpdate};
use crate::error::{AppError, Result};
use crate::port::{QueueRepository, TimeProvider, TransactionalStore};
use std::sync::Arc;
use tracing::info;

/// Queue Registry
pub struct QueueService {
    queues: Arc<dyn QueueRepository>,
    store: Arc<dyn TransactionalStore>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueService {
    pub fn new(
        queues: Arc<dyn QueueRepository>,
        store: Arc<dyn TransactionalStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queues,
            store,
            time_provider,
        }
    }

    /// Create a new active queue. Fails with `Conflict` if the name is taken.
    pub async fn create(&self, req: NewQueue) -> Result<Queue> {
        validate_new_queue(&req)?;

        if self.queues.find_by_name(&req.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Queue '{}' already exists",
                req.name
            )));
        }

        // The unique index still guards against a concurrent create
        let queue = self
            .queues
            .insert(&req, self.time_provider.now_millis())
            .await?;

        info!(queue_id = queue.id, queue = %queue.name, queue_type = %queue.queue_type, "Queue created");
        Ok(queue)
    }

    pub async fn get(&self, id: QueueId) -> Result<Queue> {
        self.queues
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue {} not found", id)))
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Queue> {
        self.queues
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Queue '{}' not found", name)))
    }

    /// All queues, newest first. Every call re-reads the store.
    pub async fn list(&self) -> Result<Vec<Queue>> {
        self.queues.list().await
    }

    /// Apply a partial update (name is immutable)
    pub async fn update(&self, id: QueueId, update: QueueUpdate) -> Result<Queue> {
        if let Some(config) = update.config.as_deref() {
            validate_config(config)?;
        }

        let mut queue = self.get(id).await?;
        queue.apply(update, self.time_provider.now_millis());

        if !self.queues.update(&queue).await? {
            return Err(AppError::NotFound(format!("Queue {} not found", id)));
        }

        info!(queue_id = id, is_active = queue.is_active, "Queue updated");
        Ok(queue)
    }

    /// Activate or deactivate a queue. Inactive queues accept no enqueue or dispatch.
    pub async fn set_active(&self, id: QueueId, active: bool) -> Result<Queue> {
        self.update(
            id,
            QueueUpdate {
                is_active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete.
    ///
    /// Rejected with `Conflict` while the queue still holds pending or
    /// processing messages. Otherwise the queue, its finished messages and
    /// its workers go away together.
    pub async fn delete(&self, id: QueueId) -> Result<()> {
        let mut tx = self.store.begin_transaction().await?;

        // Write first so the transaction holds the write lock for the check below
        let workers = tx.delete_workers_of_queue(id).await?;

        let unfinished = tx.count_unfinished_messages(id).await?;
        if unfinished > 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Queue {} still has {} pending or processing messages",
                id, unfinished
            )));
        }

        let messages = tx.delete_finished_messages_of_queue(id).await?;

        if !tx.delete_queue(id).await? {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Queue {} not found", id)));
        }

        tx.commit().await?;

        info!(
            queue_id = id,
            deleted_workers = workers,
            deleted_messages = messages,
            "Queue deleted"
        );
        Ok(())
    }
}

/// Load a queue that must exist and accept traffic
pub(crate) async fn load_active_queue(queues: &dyn QueueRepository, id: QueueId) -> Result<Queue> {
    let queue = queues
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Queue {} not found", id)))?;

    if !queue.is_active {
        return Err(AppError::InvalidState(format!(
            "Queue '{}' is inactive",
            queue.name
        )));
    }

    Ok(queue)
}

fn validate_new_queue(req: &NewQueue) -> Result<()> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Queue name cannot be empty".to_string()));
    }
    if name.len() != req.name.len() {
        return Err(AppError::Validation(
            "Queue name cannot have surrounding whitespace".to_string(),
        ));
    }
    if req.name.len() > MAX_QUEUE_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Queue name too long (max {} chars)",
            MAX_QUEUE_NAME_LEN
        )));
    }
    if req.queue_type.trim().is_empty() {
        return Err(AppError::Validation("Queue type cannot be empty".to_string()));
    }
    validate_config(&req.config)
}

/// Config is opaque to the engine but stored as JSON
fn validate_config(config: &str) -> Result<()> {
    if config.is_empty() {
        return Ok(());
    }
    serde_json::from_str::<serde_json::Value>(config)
        .map(|_| ())
        .map_err(|e| AppError::Validation(format!("Queue config is not valid JSON: {}", e)))
}
