//! Liveness sweep - reclaims work held by dead workers
//!
//! A worker that stops heartbeating keeps its messages in `processing`
//! forever unless someone releases them. Every tick the sweeper:
//! 1. Finds workers (not stopped) whose last ping is older than the cutoff
//! 2. Marks each one `stopped` and returns its processing messages to
//!    `pending`, in one transaction, unless a heartbeat landed meanwhile
//! 3. Releases messages still held by a worker that is already `stopped`
//!    (it reported itself stopped, or claimed just as it was being stopped)
//! 4. Releases anonymously claimed messages older than the cutoff
//!
//! Reclaim does not spend a retry: the message never got an outcome.

use super::constants::{DEFAULT_SWEEP_INTERVAL, DEFAULT_WORKER_STALE_AFTER_MS, ERROR_RECOVERY_SLEEP_DURATION};
use super::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{MessageRepository, TimeProvider, TransactionalStore, WorkerRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub stopped_workers: usize,
    pub released_messages: u64,
}

pub struct LivenessSweeper {
    workers: Arc<dyn WorkerRepository>,
    messages: Arc<dyn MessageRepository>,
    store: Arc<dyn TransactionalStore>,
    time_provider: Arc<dyn TimeProvider>,
    stale_after_ms: i64,
    sweep_interval: Duration,
}

impl LivenessSweeper {
    pub fn new(
        workers: Arc<dyn WorkerRepository>,
        messages: Arc<dyn MessageRepository>,
        store: Arc<dyn TransactionalStore>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            workers,
            messages,
            store,
            time_provider,
            stale_after_ms: DEFAULT_WORKER_STALE_AFTER_MS,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after_ms = stale_after.as_millis() as i64;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run a single sweep
    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.stale_after_ms;
        let mut report = SweepReport::default();

        for worker in self.workers.find_stale(cutoff).await? {
            let mut tx = self.store.begin_transaction().await?;

            if !tx.stop_worker_if_stale(worker.id, cutoff, now).await? {
                // Heartbeat raced in
                tx.rollback().await?;
                continue;
            }

            let released = tx.release_worker_messages(worker.id, now).await?;
            tx.commit().await?;

            warn!(
                worker_id = worker.id,
                worker = %worker.name,
                last_ping = worker.last_ping,
                released_messages = released,
                "Stale worker stopped, messages reclaimed"
            );

            report.stopped_workers += 1;
            report.released_messages += released;
        }

        let abandoned = self.messages.release_held_by_stopped(now).await?;
        if abandoned > 0 {
            warn!(released_messages = abandoned, "Reclaimed messages held by stopped workers");
        }
        report.released_messages += abandoned;

        let orphaned = self.messages.release_unowned_before(cutoff, now).await?;
        if orphaned > 0 {
            warn!(released_messages = orphaned, "Reclaimed unowned processing messages");
        }
        report.released_messages += orphaned;

        Ok(report)
    }

    /// Sweep loop (background task), until shutdown
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            stale_after_ms = self.stale_after_ms,
            interval_ms = self.sweep_interval.as_millis() as u64,
            "Liveness sweeper started"
        );

        let mut tick = interval(self.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => break,
            }

            match self.sweep_once().await {
                Ok(report) if report != SweepReport::default() => {
                    info!(
                        stopped_workers = report.stopped_workers,
                        released_messages = report.released_messages,
                        "Liveness sweep reclaimed work"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Liveness sweep failed");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => break,
                    }
                }
            }
        }

        info!("Liveness sweeper stopped");
    }
}
