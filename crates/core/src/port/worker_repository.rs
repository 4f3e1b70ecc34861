// Worker Repository Port (Interface)

use crate::domain::{QueueId, Worker, WorkerId, WorkerStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for worker registry and heartbeats
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// Insert a new worker and return it with its assigned id
    async fn insert(&self, worker: &Worker) -> Result<Worker>;

    /// Find worker by ID
    async fn find_by_id(&self, id: WorkerId) -> Result<Option<Worker>>;

    /// Newest-registered first, optionally filtered by queue
    async fn list(&self, queue_id: Option<QueueId>) -> Result<Vec<Worker>>;

    /// Set last_ping and status. Returns false if the worker does not exist.
    async fn heartbeat(&self, id: WorkerId, status: WorkerStatus, now_millis: i64)
        -> Result<bool>;

    /// Workers not stopped whose last ping is older than `cutoff_millis`
    async fn find_stale(&self, cutoff_millis: i64) -> Result<Vec<Worker>>;
}
