// Engine constants (no magic values)
use std::time::Duration;

/// Upper bound on candidate re-reads after lost claim races
pub const MAX_CLAIM_ATTEMPTS: usize = 16;

/// A worker silent for this long is presumed dead (60s)
pub const DEFAULT_WORKER_STALE_AFTER_MS: i64 = 60 * 1000;

/// How often the liveness sweep runs (15s)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15);

/// Sleep duration after a failed sweep before the next tick (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Longest accepted queue name
pub const MAX_QUEUE_NAME_LEN: usize = 128;
