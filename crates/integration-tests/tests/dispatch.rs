//! Dispatch selection: isolation, scheduling, ordering, claim exclusivity

mod common;

use common::Harness;
use qafka_core::domain::{MessageStatus, NewMessage};
use std::collections::HashSet;

#[tokio::test]
async fn test_queue_isolation() {
    let h = Harness::new().await;
    let a = h.queue("a").await;
    let b = h.queue("b").await;
    h.enqueue(b.id, "only-in-b", 0).await;

    let got = h.engine.dispatcher.dispatch_next(a.id, None).await.unwrap();
    assert!(got.is_none(), "queue A must not see queue B's messages");

    let got = h.claim(b.id).await;
    assert_eq!(got.queue_id, b.id);
}

#[tokio::test]
async fn test_scheduled_message_waits_for_its_time() {
    let h = Harness::new().await;
    let q = h.queue("delayed").await;

    let at = common::T0 + 10_000;
    h.engine
        .messages
        .enqueue(NewMessage::new(q.id, "later").scheduled_at(at))
        .await
        .unwrap();

    assert!(h.engine.dispatcher.dispatch_next(q.id, None).await.unwrap().is_none());

    h.clock.advance(9_999);
    assert!(h.engine.dispatcher.dispatch_next(q.id, None).await.unwrap().is_none());

    h.clock.advance(1);
    let got = h.claim(q.id).await;
    assert_eq!(got.payload, "later");
    assert_eq!(got.status, MessageStatus::Processing);
}

#[tokio::test]
async fn test_priority_then_age_ordering() {
    let h = Harness::new().await;
    let q = h.queue("ordered").await;

    let t1 = h.enqueue(q.id, "t1", 5).await;
    h.clock.advance(1);
    let t2 = h.enqueue(q.id, "t2", 1).await;
    h.clock.advance(1);
    let t3 = h.enqueue(q.id, "t3", 5).await;

    let order: Vec<i64> = vec![
        h.claim(q.id).await.id,
        h.claim(q.id).await.id,
        h.claim(q.id).await.id,
    ];
    assert_eq!(order, vec![t1.id, t3.id, t2.id]);

    assert!(h.engine.dispatcher.dispatch_next(q.id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_equal_rank_breaks_ties_by_id() {
    let h = Harness::new().await;
    let q = h.queue("ties").await;

    // Same priority, same created_at
    let first = h.enqueue(q.id, "first", 2).await;
    let second = h.enqueue(q.id, "second", 2).await;

    assert_eq!(h.claim(q.id).await.id, first.id);
    assert_eq!(h.claim(q.id).await.id, second.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatch_claims_each_message_once() {
    const MESSAGES: usize = 5;
    const CALLERS: usize = 12;

    let h = Harness::new().await;
    let q = h.queue("contended").await;
    for i in 0..MESSAGES {
        h.enqueue(q.id, &format!("m{}", i), 0).await;
    }

    let queue_id = q.id;
    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.dispatcher.dispatch_next(queue_id, None).await
        }));
    }

    let mut claimed = Vec::new();
    let mut empty = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Some(message) => claimed.push(message.id),
            None => empty += 1,
        }
    }

    let distinct: HashSet<i64> = claimed.iter().copied().collect();
    assert_eq!(claimed.len(), MESSAGES, "every message claimed");
    assert_eq!(distinct.len(), MESSAGES, "no message claimed twice");
    assert_eq!(empty, CALLERS - MESSAGES);

    let pending = h
        .engine
        .messages
        .list(qafka_core::application::MessageFilter::queue(q.id))
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.status == MessageStatus::Pending)
        .count();
    assert_eq!(pending, 0);
}

#[tokio::test]
async fn test_dispatch_metrics() {
    let h = Harness::new().await;
    let q = h.queue("observed").await;
    h.enqueue(q.id, "a", 0).await;
    h.enqueue(q.id, "b", 0).await;
    h.claim(q.id).await;

    assert_eq!(h.metrics.counter("observed", "created"), 2);
    assert_eq!(h.metrics.counter("observed", "processing"), 1);
    assert_eq!(h.metrics.depth("observed", "pending"), Some(1.0));
    assert_eq!(h.metrics.depth("observed", "processing"), Some(1.0));
}
