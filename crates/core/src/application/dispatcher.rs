//! Dispatch Selector - atomically selects and claims the next eligible message
//!
//! Selection and claim are a compare-and-set pair:
//! 1. Read the best-ranked eligible row (priority DESC, created_at ASC, id ASC)
//! 2. Flip it to `processing` only if it is still `pending`
//! 3. On a lost race, re-read; give up after `max_claim_attempts` reads
//!
//! Two concurrent callers can therefore never receive the same message.

use crate::application::depth::publish_queue_depth;
use crate::application::queue_service::load_active_queue;
use crate::application::worker::constants::MAX_CLAIM_ATTEMPTS;
use crate::domain::{Message, QueueId, WorkerId, WorkerStatus};
use crate::error::{AppError, Result};
use crate::port::{MessageRepository, MetricsSink, QueueRepository, TimeProvider, WorkerRepository};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Dispatcher {
    messages: Arc<dyn MessageRepository>,
    queues: Arc<dyn QueueRepository>,
    workers: Arc<dyn WorkerRepository>,
    metrics: Arc<dyn MetricsSink>,
    time_provider: Arc<dyn TimeProvider>,
    max_claim_attempts: usize,
}

impl Dispatcher {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        queues: Arc<dyn QueueRepository>,
        workers: Arc<dyn WorkerRepository>,
        metrics: Arc<dyn MetricsSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            messages,
            queues,
            workers,
            metrics,
            time_provider,
            max_claim_attempts: MAX_CLAIM_ATTEMPTS,
        }
    }

    /// Override the re-read bound (at least one read is always made)
    pub fn with_max_claim_attempts(mut self, attempts: usize) -> Self {
        self.max_claim_attempts = attempts.max(1);
        self
    }

    /// Claim the next eligible message of `queue_id`.
    ///
    /// Returns `Ok(None)` when nothing is eligible (NoMessageAvailable).
    /// The returned message is already `processing`.
    pub async fn dispatch_next(
        &self,
        queue_id: QueueId,
        worker_id: Option<WorkerId>,
    ) -> Result<Option<Message>> {
        let queue = load_active_queue(self.queues.as_ref(), queue_id).await?;

        if let Some(worker_id) = worker_id {
            self.check_worker(worker_id, queue_id).await?;
        }

        for attempt in 1..=self.max_claim_attempts {
            let now = self.time_provider.now_millis();

            let mut candidate = match self.messages.find_next_eligible(queue_id, now).await? {
                Some(m) => m,
                None => return Ok(None),
            };

            if !candidate.is_eligible(now) {
                return Err(AppError::Internal(format!(
                    "Store offered ineligible message {} ({}, scheduled_at {:?})",
                    candidate.id, candidate.status, candidate.scheduled_at
                )));
            }

            if !self.messages.try_claim(candidate.id, worker_id, now).await? {
                debug!(
                    message_id = candidate.id,
                    queue = %queue.name,
                    attempt = attempt,
                    "Lost claim race, re-reading"
                );
                continue;
            }

            // Mirror the stored row
            candidate.claim(worker_id, now)?;

            info!(
                message_id = candidate.id,
                queue = %queue.name,
                worker_id = ?worker_id,
                priority = candidate.priority,
                retry_count = candidate.retry_count,
                "Message dispatched"
            );

            self.metrics
                .increment_message_counter(&queue.name, "processing");
            publish_queue_depth(self.messages.as_ref(), self.metrics.as_ref(), &queue).await;

            return Ok(Some(candidate));
        }

        warn!(
            queue = %queue.name,
            attempts = self.max_claim_attempts,
            "Claim attempts exhausted under contention"
        );
        Ok(None)
    }

    async fn check_worker(&self, worker_id: WorkerId, queue_id: QueueId) -> Result<()> {
        let worker = self
            .workers
            .find_by_id(worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Worker {} not found", worker_id)))?;

        if worker.queue_id != queue_id {
            return Err(AppError::Validation(format!(
                "Worker {} is assigned to queue {}, not {}",
                worker_id, worker.queue_id, queue_id
            )));
        }

        if worker.status == WorkerStatus::Stopped {
            return Err(AppError::InvalidState(format!(
                "Worker {} is stopped; heartbeat before claiming",
                worker_id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageStatus, NewMessage, Queue, Worker};
    use crate::port::message_repository::MockMessageRepository;
    use crate::port::metrics_sink::mocks::RecordingMetricsSink;
    use crate::port::queue_repository::MockQueueRepository;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::worker_repository::MockWorkerRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn active_queues() -> MockQueueRepository {
        let mut queues = MockQueueRepository::new();
        queues.expect_find_by_id().returning(|id| {
            Ok(Some(Queue {
                id,
                name: "jobs".to_string(),
                description: String::new(),
                queue_type: "priority".to_string(),
                config: String::new(),
                is_active: true,
                created_at: 0,
                updated_at: 0,
            }))
        });
        queues
    }

    fn pending(id: i64) -> Message {
        let mut m = Message::from_request(NewMessage::new(1, format!("m{}", id)), 100);
        m.id = id;
        m
    }

    fn dispatcher(messages: MockMessageRepository, workers: MockWorkerRepository) -> Dispatcher {
        Dispatcher::new(
            Arc::new(messages),
            Arc::new(active_queues()),
            Arc::new(workers),
            Arc::new(RecordingMetricsSink::new()),
            Arc::new(ManualTimeProvider::new(1_000)),
        )
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let mut messages = MockMessageRepository::new();
        messages.expect_find_next_eligible().returning(|_, _| Ok(None));
        messages.expect_try_claim().never();

        let result = dispatcher(messages, MockWorkerRepository::new())
            .dispatch_next(1, None)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_lost_race_rereads_next_candidate() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reads_in_mock = reads.clone();

        let mut messages = MockMessageRepository::new();
        messages.expect_find_next_eligible().returning(move |_, _| {
            let n = reads_in_mock.fetch_add(1, Ordering::SeqCst);
            Ok(Some(pending(10 + n as i64)))
        });
        // First candidate is taken by someone else, second one is ours
        messages
            .expect_try_claim()
            .returning(|id, _, _| Ok(id == 11));
        messages.expect_count_by_status().returning(|_, _| Ok(0));

        let claimed = dispatcher(messages, MockWorkerRepository::new())
            .dispatch_next(1, None)
            .await
            .unwrap()
            .expect("second candidate should be claimed");

        assert_eq!(claimed.id, 11);
        assert_eq!(claimed.status, MessageStatus::Processing);
        assert_eq!(claimed.processed_at, Some(1_000));
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bounded_retries_give_up() {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_next_eligible()
            .times(3)
            .returning(|_, _| Ok(Some(pending(5))));
        messages.expect_try_claim().times(3).returning(|_, _, _| Ok(false));

        let result = dispatcher(messages, MockWorkerRepository::new())
            .with_max_claim_attempts(3)
            .dispatch_next(1, None)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ineligible_candidate_is_not_claimed() {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_next_eligible()
            .returning(|_, _| {
                let mut m =
                    Message::from_request(NewMessage::new(1, "later").scheduled_at(5_000), 100);
                m.id = 5;
                Ok(Some(m))
            });
        messages.expect_try_claim().never();

        let err = dispatcher(messages, MockWorkerRepository::new())
            .dispatch_next(1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_worker_from_other_queue_rejected() {
        let mut workers = MockWorkerRepository::new();
        workers
            .expect_find_by_id()
            .returning(|id| Ok(Some(Worker { id, ..Worker::register("w", 2, 0) })));

        let mut messages = MockMessageRepository::new();
        messages.expect_find_next_eligible().never();

        let err = dispatcher(messages, workers)
            .dispatch_next(1, Some(4))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_worker_not_found() {
        let mut workers = MockWorkerRepository::new();
        workers.expect_find_by_id().returning(|_| Ok(None));

        let err = dispatcher(MockMessageRepository::new(), workers)
            .dispatch_next(1, Some(4))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
