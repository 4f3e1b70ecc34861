//! Worker liveness: stale workers are stopped and their messages reclaimed

mod common;

use common::Harness;
use qafka_core::application::{Outcome, SweepReport};
use qafka_core::domain::{MessageStatus, WorkerStatus};
use qafka_core::port::MessageRepository;
use qafka_core::AppError;
use qafka_infra_sqlite::SqliteMessageRepository;
use std::time::Duration;

const STALE_AFTER_MS: i64 = 60_000;

#[tokio::test]
async fn test_stale_worker_messages_are_reclaimed() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let w = h.engine.workers.register("crashy", q.id).await.unwrap();
    let m = h.enqueue(q.id, "x", 0).await;

    h.engine
        .dispatcher
        .dispatch_next(q.id, Some(w.id))
        .await
        .unwrap()
        .unwrap();

    let sweeper = h
        .engine
        .liveness_sweeper()
        .with_stale_after(Duration::from_millis(STALE_AFTER_MS as u64));

    // Within the threshold nothing happens
    h.clock.advance(STALE_AFTER_MS);
    assert_eq!(sweeper.sweep_once().await.unwrap(), SweepReport::default());

    h.clock.advance(1);
    let report = sweeper.sweep_once().await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            stopped_workers: 1,
            released_messages: 1
        }
    );

    let reclaimed = h.engine.messages.get(m.id).await.unwrap();
    assert_eq!(reclaimed.status, MessageStatus::Pending);
    assert_eq!(reclaimed.retry_count, 0);
    assert!(reclaimed.worker_id.is_none());
    assert!(reclaimed.processed_at.is_none());

    let stopped = h.engine.workers.get(w.id).await.unwrap();
    assert_eq!(stopped.status, WorkerStatus::Stopped);

    // A stopped worker must heartbeat before claiming again
    let err = h
        .engine
        .dispatcher
        .dispatch_next(q.id, Some(w.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    h.engine
        .workers
        .heartbeat(w.id, WorkerStatus::Idle)
        .await
        .unwrap();
    let again = h
        .engine
        .dispatcher
        .dispatch_next(q.id, Some(w.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, m.id);
}

#[tokio::test]
async fn test_heartbeat_keeps_worker_alive() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let w = h.engine.workers.register("steady", q.id).await.unwrap();
    h.enqueue(q.id, "x", 0).await;
    h.engine
        .dispatcher
        .dispatch_next(q.id, Some(w.id))
        .await
        .unwrap()
        .unwrap();

    let sweeper = h.engine.liveness_sweeper();
    for _ in 0..3 {
        h.clock.advance(STALE_AFTER_MS / 2);
        h.engine
            .workers
            .heartbeat(w.id, WorkerStatus::Busy)
            .await
            .unwrap();
        assert_eq!(sweeper.sweep_once().await.unwrap(), SweepReport::default());
    }

    assert_eq!(
        h.engine.workers.get(w.id).await.unwrap().status,
        WorkerStatus::Busy
    );
}

#[tokio::test]
async fn test_late_report_after_reclaim_is_rejected() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let slow = h.engine.workers.register("slow", q.id).await.unwrap();
    let fast = h.engine.workers.register("fast", q.id).await.unwrap();
    let m = h.enqueue(q.id, "x", 0).await;

    let first = h
        .engine
        .dispatcher
        .dispatch_next(q.id, Some(slow.id))
        .await
        .unwrap()
        .unwrap();
    let slow_receipt = first.receipt().unwrap();

    h.clock.advance(STALE_AFTER_MS + 1);
    h.engine
        .workers
        .heartbeat(fast.id, WorkerStatus::Idle)
        .await
        .unwrap();
    h.engine.liveness_sweeper().sweep_once().await.unwrap();

    // Reclaimed and not yet re-dispatched: pending
    let err = h
        .engine
        .lifecycle
        .report_for_claim(slow_receipt, Outcome::Completed)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    // Re-dispatched to another worker: the old claim cannot settle it
    let second = h
        .engine
        .dispatcher
        .dispatch_next(q.id, Some(fast.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.id, m.id);

    let err = h
        .engine
        .lifecycle
        .report_for_claim(slow_receipt, Outcome::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let held = h.engine.messages.get(m.id).await.unwrap();
    assert_eq!(held.status, MessageStatus::Processing);
    assert_eq!(held.worker_id, Some(fast.id));
    assert_eq!(h.engine.workers.get(fast.id).await.unwrap().processed_count, 0);

    // The current claim settles normally
    h.clock.advance(10);
    let done = h
        .engine
        .lifecycle
        .report_for_claim(second.receipt().unwrap(), Outcome::Completed)
        .await
        .unwrap();
    assert_eq!(done.status, MessageStatus::Completed);
    assert_eq!(h.engine.workers.get(fast.id).await.unwrap().processed_count, 1);
    assert_eq!(h.engine.workers.get(slow.id).await.unwrap().processed_count, 0);
}

#[tokio::test]
async fn test_worker_reporting_stopped_releases_its_claims() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let w = h.engine.workers.register("leaving", q.id).await.unwrap();
    let m = h.enqueue(q.id, "x", 0).await;
    h.engine
        .dispatcher
        .dispatch_next(q.id, Some(w.id))
        .await
        .unwrap()
        .unwrap();

    h.engine
        .workers
        .heartbeat(w.id, WorkerStatus::Stopped)
        .await
        .unwrap();

    // Not stale yet, but a stopped worker holds nothing
    let report = h.engine.liveness_sweeper().sweep_once().await.unwrap();
    assert_eq!(
        report,
        SweepReport {
            stopped_workers: 0,
            released_messages: 1
        }
    );

    let released = h.engine.messages.get(m.id).await.unwrap();
    assert_eq!(released.status, MessageStatus::Pending);
    assert!(released.worker_id.is_none());
    assert_eq!(released.retry_count, 0);

    // Nothing left for later sweeps
    h.clock.advance(10 * 60 * 1000);
    assert_eq!(
        h.engine.liveness_sweeper().sweep_once().await.unwrap(),
        SweepReport::default()
    );
    assert_eq!(h.claim(q.id).await.id, m.id);
}

#[tokio::test]
async fn test_claim_landing_after_stop_is_released() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let w = h.engine.workers.register("racing", q.id).await.unwrap();
    let m = h.enqueue(q.id, "x", 0).await;

    // The sweeper stops the worker between its dispatch check and its claim
    h.clock.advance(STALE_AFTER_MS + 1);
    let report = h.engine.liveness_sweeper().sweep_once().await.unwrap();
    assert_eq!(report.stopped_workers, 1);

    let messages = SqliteMessageRepository::new(h.pool.clone());
    assert!(messages
        .try_claim(m.id, Some(w.id), common::T0 + STALE_AFTER_MS + 1)
        .await
        .unwrap());

    let report = h.engine.liveness_sweeper().sweep_once().await.unwrap();
    assert_eq!(report.stopped_workers, 0);
    assert_eq!(report.released_messages, 1);

    let released = h.engine.messages.get(m.id).await.unwrap();
    assert_eq!(released.status, MessageStatus::Pending);
    assert!(released.worker_id.is_none());
}

#[tokio::test]
async fn test_anonymous_claims_are_reclaimed_too() {
    let h = Harness::new().await;
    let q = h.queue("jobs").await;
    let m = h.enqueue(q.id, "x", 0).await;
    h.claim(q.id).await;

    h.clock.advance(STALE_AFTER_MS + 1);
    let report = h.engine.liveness_sweeper().sweep_once().await.unwrap();
    assert_eq!(report.stopped_workers, 0);
    assert_eq!(report.released_messages, 1);
    assert_eq!(
        h.engine.messages.get(m.id).await.unwrap().status,
        MessageStatus::Pending
    );
}
