// Worker Registry & Heartbeat Tracker

pub mod constants;
mod liveness;
mod shutdown;

pub use liveness::{LivenessSweeper, SweepReport};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::{QueueId, Worker, WorkerId, WorkerStatus};
use crate::error::{AppError, Result};
use crate::port::{QueueRepository, TimeProvider, WorkerRepository};
use std::sync::Arc;
use tracing::{debug, info};

/// Worker registry. Liveness enforcement lives in `LivenessSweeper`.
pub struct WorkerService {
    workers: Arc<dyn WorkerRepository>,
    queues: Arc<dyn QueueRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl WorkerService {
    pub fn new(
        workers: Arc<dyn WorkerRepository>,
        queues: Arc<dyn QueueRepository>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            workers,
            queues,
            time_provider,
        }
    }

    /// Register a worker on a queue: idle, pinged now, counters zeroed
    pub async fn register(&self, name: impl Into<String>, queue_id: QueueId) -> Result<Worker> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AppError::Validation("Worker name cannot be empty".to_string()));
        }

        if self.queues.find_by_id(queue_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Queue {} not found", queue_id)));
        }

        let worker = Worker::register(name, queue_id, self.time_provider.now_millis());
        let worker = self.workers.insert(&worker).await?;

        info!(worker_id = worker.id, worker = %worker.name, queue_id = queue_id, "Worker registered");
        Ok(worker)
    }

    /// Record a heartbeat: last_ping = now, status as reported
    pub async fn heartbeat(&self, id: WorkerId, status: WorkerStatus) -> Result<Worker> {
        let now = self.time_provider.now_millis();
        if !self.workers.heartbeat(id, status, now).await? {
            return Err(AppError::NotFound(format!("Worker {} not found", id)));
        }

        debug!(worker_id = id, status = %status, "Heartbeat");
        self.get(id).await
    }

    /// Newest-registered first. Zero/absent queue = all workers.
    pub async fn list(&self, queue_id: Option<QueueId>) -> Result<Vec<Worker>> {
        self.workers.list(queue_id.filter(|id| *id > 0)).await
    }

    pub async fn get(&self, id: WorkerId) -> Result<Worker> {
        self.workers
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Worker {} not found", id)))
    }
}
