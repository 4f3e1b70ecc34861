// Maintenance Scheduler
// Periodic GC of finished messages and VACUUM of the store

use crate::application::worker::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs `Maintenance::run_full_maintenance` every `interval`, first tick immediately.
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    interval: Duration,
}

impl MaintenanceScheduler {
    pub fn new(
        maintenance: Arc<dyn Maintenance>,
        config: MaintenanceConfig,
        interval: Duration,
    ) -> Self {
        Self {
            maintenance,
            config,
            interval,
        }
    }

    /// Maintenance loop (background task), until shutdown
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            retention_days = self.config.finished_message_retention_days,
            "Maintenance scheduler started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            tokio::select! {
                _ = tick.tick() => {},
                _ = shutdown.wait() => break,
            }

            match self.maintenance.run_full_maintenance(&self.config).await {
                Ok(report) => log_report("Scheduled maintenance completed", &report),
                Err(e) => error!(error = %e, "Scheduled maintenance failed"),
            }
        }

        info!("Maintenance scheduler stopped");
    }

    /// Run maintenance immediately (manual trigger)
    pub async fn run_now(&self) -> Result<MaintenanceReport> {
        let report = self.maintenance.run_full_maintenance(&self.config).await?;
        log_report("Manual maintenance completed", &report);
        Ok(report)
    }
}

fn log_report(msg: &str, report: &MaintenanceReport) {
    let stats = &report.stats;
    info!(
        deleted_messages = report.deleted_messages,
        reclaimed_mb = ?report.reclaimed_mb,
        db_size_mb = stats.db_size_mb,
        queues = stats.queue_count,
        messages = stats.message_count,
        finished_messages = stats.finished_message_count,
        workers = stats.worker_count,
        "{}",
        msg
    );
}
