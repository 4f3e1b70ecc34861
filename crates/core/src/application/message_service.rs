// Message Store - enqueue and read paths

use crate::application::depth::publish_queue_depth;
use crate::application::queue_service::load_active_queue;
use crate::domain::{Message, MessageId, NewMessage, QueueId};
use crate::error::{AppError, Result};
use crate::port::{MessageRepository, MetricsSink, QueueRepository, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// List filter. Zero/absent queue = all queues, non-positive/absent limit = unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageFilter {
    #[serde(default)]
    pub queue_id: Option<QueueId>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl MessageFilter {
    pub fn queue(queue_id: QueueId) -> Self {
        Self {
            queue_id: Some(queue_id),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    queues: Arc<dyn QueueRepository>,
    metrics: Arc<dyn MetricsSink>,
    time_provider: Arc<dyn TimeProvider>,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        queues: Arc<dyn QueueRepository>,
        metrics: Arc<dyn MetricsSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            messages,
            queues,
            metrics,
            time_provider,
        }
    }

    /// Enqueue a message as `pending`.
    ///
    /// `NotFound` for an unknown queue, `InvalidState` for an inactive one.
    pub async fn enqueue(&self, req: NewMessage) -> Result<Message> {
        let queue = load_active_queue(self.queues.as_ref(), req.queue_id).await?;

        let message = Message::from_request(req, self.time_provider.now_millis());
        let message = self.messages.insert(&message).await?;

        info!(
            message_id = message.id,
            queue = %queue.name,
            priority = message.priority,
            scheduled_at = ?message.scheduled_at,
            "Message enqueued"
        );

        self.metrics
            .increment_message_counter(&queue.name, "created");
        publish_queue_depth(self.messages.as_ref(), self.metrics.as_ref(), &queue).await;

        Ok(message)
    }

    /// Newest-created first
    pub async fn list(&self, filter: MessageFilter) -> Result<Vec<Message>> {
        let queue_id = filter.queue_id.filter(|id| *id > 0);
        let limit = filter.limit.filter(|l| *l > 0);
        self.messages.list(queue_id, limit).await
    }

    pub async fn get(&self, id: MessageId) -> Result<Message> {
        self.messages
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
    }
}
