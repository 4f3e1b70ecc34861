//! Shared harness: the full engine over a file-backed SQLite store

#![allow(dead_code)]

use qafka_core::application::{Engine, EnginePorts};
use qafka_core::domain::{Message, NewMessage, NewQueue, Queue, QueueId};
use qafka_core::port::metrics_sink::mocks::RecordingMetricsSink;
use qafka_core::port::time_provider::mocks::ManualTimeProvider;
use qafka_infra_sqlite::{
    create_pool, run_migrations, SqliteMessageRepository, SqliteQueueRepository, SqliteStore,
    SqliteWorkerRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

pub const T0: i64 = 1_700_000_000_000;

pub struct Harness {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualTimeProvider>,
    pub metrics: Arc<RecordingMetricsSink>,
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("qafka.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualTimeProvider::new(T0));
        let metrics = Arc::new(RecordingMetricsSink::new());

        let engine = Engine::new(EnginePorts {
            queues: Arc::new(SqliteQueueRepository::new(pool.clone())),
            messages: Arc::new(SqliteMessageRepository::new(pool.clone())),
            workers: Arc::new(SqliteWorkerRepository::new(pool.clone())),
            store: Arc::new(SqliteStore::new(pool.clone())),
            metrics: metrics.clone(),
            time_provider: clock.clone(),
        });

        Self {
            engine: Arc::new(engine),
            clock,
            metrics,
            pool,
            _dir: dir,
        }
    }

    pub async fn queue(&self, name: &str) -> Queue {
        self.engine
            .queues
            .create(NewQueue::new(name, "priority"))
            .await
            .unwrap()
    }

    pub async fn enqueue(&self, queue_id: QueueId, payload: &str, priority: i32) -> Message {
        self.engine
            .messages
            .enqueue(NewMessage::new(queue_id, payload).with_priority(priority))
            .await
            .unwrap()
    }

    /// Anonymous dispatch that must find something
    pub async fn claim(&self, queue_id: QueueId) -> Message {
        self.engine
            .dispatcher
            .dispatch_next(queue_id, None)
            .await
            .unwrap()
            .expect("an eligible message")
    }
}
