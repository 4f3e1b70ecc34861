// Message Repository Port (Interface)

use crate::domain::{Message, MessageId, MessageStatus, QueueId, WorkerId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for message persistence and dispatch selection
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a new message and return it with its assigned id.
    ///
    /// Fails with `NotFound` if `queue_id` references no queue.
    async fn insert(&self, message: &Message) -> Result<Message>;

    /// Find message by ID
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>>;

    /// Newest-created first. `None` queue means all queues, `None` limit means unbounded.
    async fn list(&self, queue_id: Option<QueueId>, limit: Option<i64>) -> Result<Vec<Message>>;

    /// Best-ranked eligible message of a queue at `now_millis`
    ///
    /// Eligible: pending and (no schedule or schedule <= now).
    /// Ranking: priority DESC, created_at ASC, id ASC.
    async fn find_next_eligible(&self, queue_id: QueueId, now_millis: i64)
        -> Result<Option<Message>>;

    /// Compare-and-set claim: pending -> processing only if still pending.
    ///
    /// Returns false when another caller won the race.
    async fn try_claim(
        &self,
        id: MessageId,
        worker_id: Option<WorkerId>,
        now_millis: i64,
    ) -> Result<bool>;

    /// Count messages of a queue in a status
    async fn count_by_status(&self, queue_id: QueueId, status: MessageStatus) -> Result<i64>;

    /// Release processing messages with no owning worker claimed before `cutoff_millis`
    async fn release_unowned_before(&self, cutoff_millis: i64, now_millis: i64) -> Result<u64>;

    /// Release processing messages whose owning worker is `stopped`
    async fn release_held_by_stopped(&self, now_millis: i64) -> Result<u64>;
}
