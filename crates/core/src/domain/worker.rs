// Worker Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::QueueId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Worker identifier (store-assigned row id)
pub type WorkerId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Stopped,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idle" => Ok(WorkerStatus::Idle),
            "busy" => Ok(WorkerStatus::Busy),
            "stopped" => Ok(WorkerStatus::Stopped),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Worker Entity
///
/// `processed_count` and `failed_count` only grow; the store increments
/// them in place so horizontally scaled engines never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    pub queue_id: QueueId,
    pub status: WorkerStatus,
    pub last_ping: i64,
    pub processed_count: i64,
    pub failed_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Worker {
    /// Freshly registered worker (id assigned by the store)
    pub fn register(name: impl Into<String>, queue_id: QueueId, now_millis: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            queue_id,
            status: WorkerStatus::Idle,
            last_ping: now_millis,
            processed_count: 0,
            failed_count: 0,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }
}
