//! Daemon configuration from `QAFKA_*` environment variables

use qafka_core::error::{AppError, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.qafka/qafka.db";
const DEFAULT_METRICS_PORT: u16 = 2112;
const DEFAULT_WORKER_STALE_AFTER_SECS: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 15;
const DEFAULT_RETENTION_DAYS: i64 = 7;
const DEFAULT_MAINTENANCE_INTERVAL_HOURS: u64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: String,
    pub log_format: LogFormat,
    /// `None` disables the Prometheus exporter
    pub metrics_port: Option<u16>,
    pub worker_stale_after: Duration,
    pub sweep_interval: Duration,
    pub retention_days: i64,
    pub maintenance_interval: Duration,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw_path = lookup("QAFKA_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&raw_path).into_owned();

        let log_format = match lookup("QAFKA_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "QAFKA_LOG_FORMAT must be 'json' or 'pretty', got '{}'",
                    other
                )))
            }
        };

        let metrics_port: u16 = parse_or(&lookup, "QAFKA_METRICS_PORT", DEFAULT_METRICS_PORT)?;
        let stale_secs: u64 = parse_or(
            &lookup,
            "QAFKA_WORKER_STALE_AFTER_SECS",
            DEFAULT_WORKER_STALE_AFTER_SECS,
        )?;
        let sweep_secs: u64 =
            parse_or(&lookup, "QAFKA_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let retention_days: i64 =
            parse_or(&lookup, "QAFKA_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?;
        let maintenance_hours: u64 = parse_or(
            &lookup,
            "QAFKA_MAINTENANCE_INTERVAL_HOURS",
            DEFAULT_MAINTENANCE_INTERVAL_HOURS,
        )?;

        if stale_secs == 0 || sweep_secs == 0 || maintenance_hours == 0 {
            return Err(AppError::Config(
                "Intervals and the stale threshold must be positive".to_string(),
            ));
        }
        if retention_days < 0 {
            return Err(AppError::Config(
                "QAFKA_RETENTION_DAYS cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            log_format,
            metrics_port: (metrics_port != 0).then_some(metrics_port),
            worker_stale_after: Duration::from_secs(stale_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            retention_days,
            maintenance_interval: Duration::from_secs(maintenance_hours * 3600),
        })
    }

    /// sqlx connection URL for `db_path`
    pub fn database_url(&self) -> String {
        if self.db_path.starts_with("sqlite:") {
            self.db_path.clone()
        } else {
            format!("sqlite://{}", self.db_path)
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, raw))),
    }
}
