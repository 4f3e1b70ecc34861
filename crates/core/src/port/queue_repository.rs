// Queue Repository Port (Interface)

use crate::domain::{NewQueue, Queue, QueueId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for queue definitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new queue (active). Fails with `Conflict` on a duplicate name.
    async fn insert(&self, queue: &NewQueue, now_millis: i64) -> Result<Queue>;

    /// Find queue by ID
    async fn find_by_id(&self, id: QueueId) -> Result<Option<Queue>>;

    /// Find queue by its unique name
    async fn find_by_name(&self, name: &str) -> Result<Option<Queue>>;

    /// All queues, newest first
    async fn list(&self) -> Result<Vec<Queue>>;

    /// Persist mutable fields. Returns false if the row is gone.
    async fn update(&self, queue: &Queue) -> Result<bool>;
}
