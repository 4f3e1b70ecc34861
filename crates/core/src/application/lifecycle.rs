// Message Lifecycle - outcome reports and status updates

use crate::application::depth::publish_queue_depth;
use crate::domain::{ClaimReceipt, DomainError, Message, MessageId, MessageStatus, RetryDecision};
use crate::error::{AppError, Result};
use crate::port::{MessageRepository, MetricsSink, QueueRepository, TimeProvider, TransactionalStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome reported by a worker for a processing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Failed {
        #[serde(default)]
        error: Option<String>,
    },
}

impl Outcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Outcome::Failed {
            error: Some(error.into()),
        }
    }

    fn target(&self) -> MessageStatus {
        match self {
            Outcome::Completed => MessageStatus::Completed,
            Outcome::Failed { .. } => MessageStatus::Failed,
        }
    }
}

pub struct LifecycleService {
    messages: Arc<dyn MessageRepository>,
    queues: Arc<dyn QueueRepository>,
    store: Arc<dyn TransactionalStore>,
    metrics: Arc<dyn MetricsSink>,
    time_provider: Arc<dyn TimeProvider>,
}

impl LifecycleService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        queues: Arc<dyn QueueRepository>,
        store: Arc<dyn TransactionalStore>,
        metrics: Arc<dyn MetricsSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            messages,
            queues,
            store,
            metrics,
            time_provider,
        }
    }

    /// Apply an outcome to whatever claim currently holds a `processing` message.
    ///
    /// The message write and the claiming worker's counter increment commit
    /// together. Returns the message as stored: `completed`, `failed`, or
    /// `pending` again when a failure still had retries left.
    pub async fn report_outcome(&self, id: MessageId, outcome: Outcome) -> Result<Message> {
        self.apply_outcome(id, None, outcome).await
    }

    /// Apply an outcome on behalf of the claim identified by `receipt`.
    ///
    /// `Conflict` if the message was reclaimed and dispatched again since,
    /// `InvalidTransition` if it is no longer processing at all.
    pub async fn report_for_claim(&self, receipt: ClaimReceipt, outcome: Outcome) -> Result<Message> {
        self.apply_outcome(receipt.message_id, Some(receipt), outcome).await
    }

    async fn apply_outcome(
        &self,
        id: MessageId,
        receipt: Option<ClaimReceipt>,
        outcome: Outcome,
    ) -> Result<Message> {
        let mut message = self
            .messages
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

        if let Some(receipt) = receipt {
            if message.status == MessageStatus::Processing && !message.is_held_by(&receipt) {
                warn!(
                    message_id = id,
                    reported_by = ?receipt.worker_id,
                    held_by = ?message.worker_id,
                    "Outcome report for a superseded claim"
                );
                return Err(newer_claim(id));
            }
        }

        let now = self.time_provider.now_millis();
        let target = outcome.target();
        let claimed_by = message.worker_id;
        let claimed_at = message.processed_at;
        let processing_millis = message.processing_millis(now);

        let (processed, failed, event) = match outcome {
            Outcome::Completed => {
                message.complete(now)?;
                (1, 0, "completed")
            }
            Outcome::Failed { error } => match message.fail(error, now)? {
                RetryDecision::Retry => (0, 1, "retried"),
                RetryDecision::Exhausted => (0, 1, "failed"),
            },
        };

        let mut tx = self.store.begin_transaction().await?;

        if !tx
            .update_message_if(&message, MessageStatus::Processing, claimed_by, claimed_at)
            .await?
        {
            tx.rollback().await?;
            // Lost to a concurrent report, a reclaim or a newer claim
            return Err(self.stale_report_error(id, target).await);
        }

        if let Some(worker_id) = claimed_by {
            tx.increment_worker_counters(worker_id, processed, failed, now)
                .await?;
        }

        tx.commit().await?;

        info!(
            message_id = id,
            status = %message.status,
            retry_count = message.retry_count,
            max_retries = message.max_retries,
            worker_id = ?claimed_by,
            event = event,
            "Message outcome recorded"
        );

        self.observe(&message, event, processing_millis).await;

        Ok(message)
    }

    /// Generic status entry point.
    ///
    /// Only `completed` and `failed` can be requested; `processing` belongs
    /// to dispatch and `pending` to the retry/reclaim paths.
    pub async fn update_status(
        &self,
        id: MessageId,
        status: MessageStatus,
        error_message: Option<String>,
    ) -> Result<Message> {
        match status {
            MessageStatus::Completed => self.report_outcome(id, Outcome::Completed).await,
            MessageStatus::Failed => {
                self.report_outcome(
                    id,
                    Outcome::Failed {
                        error: error_message,
                    },
                )
                .await
            }
            MessageStatus::Pending | MessageStatus::Processing => {
                let message = self
                    .messages
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;
                Err(DomainError::InvalidStateTransition {
                    from: message.status,
                    to: status,
                }
                .into())
            }
        }
    }

    async fn stale_report_error(&self, id: MessageId, target: MessageStatus) -> AppError {
        match self.messages.find_by_id(id).await {
            Ok(Some(current)) if current.status == MessageStatus::Processing => newer_claim(id),
            Ok(Some(current)) => DomainError::InvalidStateTransition {
                from: current.status,
                to: target,
            }
            .into(),
            Ok(None) => AppError::NotFound(format!("Message {} not found", id)),
            Err(e) => e,
        }
    }

    async fn observe(&self, message: &Message, event: &str, processing_millis: Option<i64>) {
        let queue = match self.queues.find_by_id(message.queue_id).await {
            Ok(Some(queue)) => queue,
            Ok(None) => return,
            Err(e) => {
                warn!(message_id = message.id, error = %e, "Skipping outcome metrics");
                return;
            }
        };

        self.metrics.increment_message_counter(&queue.name, event);
        if let Some(millis) = processing_millis {
            self.metrics
                .observe_processing_time(&queue.name, millis as f64 / 1000.0);
        }
        publish_queue_depth(self.messages.as_ref(), self.metrics.as_ref(), &queue).await;
    }
}

fn newer_claim(id: MessageId) -> AppError {
    AppError::Conflict(format!("Message {} is held by a newer claim", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewMessage, QueueId, WorkerId};
    use crate::port::message_repository::MockMessageRepository;
    use crate::port::metrics_sink::mocks::RecordingMetricsSink;
    use crate::port::queue_repository::MockQueueRepository;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::{StoreTransaction, Transaction};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory transaction that records what was written
    #[derive(Default)]
    struct Journal {
        updates: Vec<Message>,
        counters: Vec<(WorkerId, i64, i64)>,
        commits: usize,
    }

    struct JournalStore {
        journal: Arc<Mutex<Journal>>,
        accept_update: bool,
    }

    struct JournalTx {
        journal: Arc<Mutex<Journal>>,
        accept_update: bool,
        updates: Vec<Message>,
        counters: Vec<(WorkerId, i64, i64)>,
    }

    #[async_trait]
    impl TransactionalStore for JournalStore {
        async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>> {
            Ok(Box::new(JournalTx {
                journal: self.journal.clone(),
                accept_update: self.accept_update,
                updates: vec![],
                counters: vec![],
            }))
        }
    }

    #[async_trait]
    impl Transaction for JournalTx {
        async fn commit(self: Box<Self>) -> Result<()> {
            let this = *self;
            let mut journal = this.journal.lock().unwrap();
            journal.updates.extend(this.updates);
            journal.counters.extend(this.counters);
            journal.commits += 1;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl StoreTransaction for JournalTx {
        async fn update_message_if(
            &mut self,
            message: &Message,
            _: MessageStatus,
            _: Option<WorkerId>,
            _: Option<i64>,
        ) -> Result<bool> {
            if self.accept_update {
                self.updates.push(message.clone());
            }
            Ok(self.accept_update)
        }

        async fn increment_worker_counters(
            &mut self,
            worker_id: WorkerId,
            processed: i64,
            failed: i64,
            _: i64,
        ) -> Result<()> {
            self.counters.push((worker_id, processed, failed));
            Ok(())
        }

        async fn stop_worker_if_stale(&mut self, _: WorkerId, _: i64, _: i64) -> Result<bool> {
            unreachable!()
        }

        async fn release_worker_messages(&mut self, _: WorkerId, _: i64) -> Result<u64> {
            unreachable!()
        }

        async fn delete_workers_of_queue(&mut self, _: QueueId) -> Result<u64> {
            unreachable!()
        }

        async fn count_unfinished_messages(&mut self, _: QueueId) -> Result<i64> {
            unreachable!()
        }

        async fn delete_finished_messages_of_queue(&mut self, _: QueueId) -> Result<u64> {
            unreachable!()
        }

        async fn delete_queue(&mut self, _: QueueId) -> Result<bool> {
            unreachable!()
        }
    }

    fn claimed(status: MessageStatus) -> Message {
        let mut m = Message::from_request(NewMessage::new(1, "x").with_max_retries(2), 1_000);
        m.id = 7;
        m.claim(Some(3), 2_000).unwrap();
        m.status = status;
        m
    }

    fn service(stored: Message, accept_update: bool) -> (LifecycleService, Arc<Mutex<Journal>>) {
        let mut messages = MockMessageRepository::new();
        messages
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        messages.expect_count_by_status().returning(|_, _| Ok(0));

        let mut queues = MockQueueRepository::new();
        queues.expect_find_by_id().returning(|_| Ok(None));

        let journal = Arc::new(Mutex::new(Journal::default()));
        let svc = LifecycleService::new(
            Arc::new(messages),
            Arc::new(queues),
            Arc::new(JournalStore {
                journal: journal.clone(),
                accept_update,
            }),
            Arc::new(RecordingMetricsSink::new()),
            Arc::new(ManualTimeProvider::new(3_500)),
        );
        (svc, journal)
    }

    #[tokio::test]
    async fn test_complete_increments_processed() {
        let (svc, journal) = service(claimed(MessageStatus::Processing), true);

        let message = svc.report_outcome(7, Outcome::Completed).await.unwrap();
        assert_eq!(message.status, MessageStatus::Completed);

        let journal = journal.lock().unwrap();
        assert_eq!(journal.commits, 1);
        assert_eq!(journal.counters, vec![(3, 1, 0)]);
    }

    #[tokio::test]
    async fn test_failure_with_budget_goes_back_to_pending() {
        let (svc, journal) = service(claimed(MessageStatus::Processing), true);

        let message = svc
            .report_outcome(7, Outcome::failed("timeout"))
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(message.retry_count, 1);
        assert_eq!(message.error_message.as_deref(), Some("timeout"));
        assert!(message.worker_id.is_none());

        // Counter still goes to the worker that held the claim
        assert_eq!(journal.lock().unwrap().counters, vec![(3, 0, 1)]);
    }

    #[tokio::test]
    async fn test_completed_message_rejected() {
        let (svc, journal) = service(claimed(MessageStatus::Completed), true);

        let err = svc.report_outcome(7, Outcome::Completed).await.unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(journal.lock().unwrap().commits, 0);
    }

    #[tokio::test]
    async fn test_report_against_newer_claim_conflicts() {
        // Row still processing but the conditional write missed: re-claimed meanwhile
        let (svc, journal) = service(claimed(MessageStatus::Processing), false);

        let err = svc.report_outcome(7, Outcome::Completed).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(journal.lock().unwrap().commits, 0);
    }

    #[tokio::test]
    async fn test_receipt_from_superseded_claim_conflicts() {
        let stored = claimed(MessageStatus::Processing);
        let mut earlier = stored.receipt().unwrap();
        earlier.worker_id = Some(9);
        let (svc, journal) = service(stored, true);

        let err = svc
            .report_for_claim(earlier, Outcome::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(journal.lock().unwrap().commits, 0);
    }

    #[tokio::test]
    async fn test_receipt_of_current_claim_applies() {
        let stored = claimed(MessageStatus::Processing);
        let receipt = stored.receipt().unwrap();
        let (svc, journal) = service(stored, true);

        let message = svc
            .report_for_claim(receipt, Outcome::failed("boom"))
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Pending);
        assert_eq!(journal.lock().unwrap().counters, vec![(3, 0, 1)]);
    }

    #[tokio::test]
    async fn test_update_status_rejects_manual_claim() {
        let (svc, _) = service(claimed(MessageStatus::Pending), true);

        let err = svc
            .update_status(7, MessageStatus::Processing, None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());
    }
}
