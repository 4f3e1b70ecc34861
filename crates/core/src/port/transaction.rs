// Transaction port for atomic multi-row operations

use crate::domain::{Message, MessageStatus, QueueId, WorkerId};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Store that can open transactions
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// Store operations within a transaction
///
/// Dropping the transaction without commit rolls it back.
#[async_trait]
pub trait StoreTransaction: Transaction {
    /// Write the mutable lifecycle fields of `message`, only if the stored
    /// row is still in `expected` status under the claim made by
    /// `claimed_by` at `claimed_at`. Returns false otherwise.
    async fn update_message_if(
        &mut self,
        message: &Message,
        expected: MessageStatus,
        claimed_by: Option<WorkerId>,
        claimed_at: Option<i64>,
    ) -> Result<bool>;

    /// Atomic in-place counter increments
    async fn increment_worker_counters(
        &mut self,
        worker_id: WorkerId,
        processed: i64,
        failed: i64,
        now_millis: i64,
    ) -> Result<()>;

    /// Mark a worker stopped if its last ping is still older than `cutoff_millis`
    async fn stop_worker_if_stale(
        &mut self,
        worker_id: WorkerId,
        cutoff_millis: i64,
        now_millis: i64,
    ) -> Result<bool>;

    /// Return every message the worker holds in processing to pending
    async fn release_worker_messages(&mut self, worker_id: WorkerId, now_millis: i64)
        -> Result<u64>;

    /// Delete the workers registered on a queue
    async fn delete_workers_of_queue(&mut self, queue_id: QueueId) -> Result<u64>;

    /// Pending + processing messages of a queue
    async fn count_unfinished_messages(&mut self, queue_id: QueueId) -> Result<i64>;

    /// Delete completed/failed messages of a queue
    async fn delete_finished_messages_of_queue(&mut self, queue_id: QueueId) -> Result<u64>;

    /// Delete the queue row. Returns false if it did not exist.
    async fn delete_queue(&mut self, queue_id: QueueId) -> Result<bool>;
}
