// Message Domain Model & Lifecycle State Machine

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::QueueId;
use crate::domain::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Message ID (store-assigned row id)
pub type MessageId = i64;

/// Priority (higher number = served first)
pub type Priority = i32;

/// Retry budget applied when the caller supplies none (or zero)
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Message status
///
/// `Completed` and `Failed` are terminal. A failure only stays `Failed`
/// once the retry budget is spent; otherwise it re-enters `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 4] = [
        MessageStatus::Pending,
        MessageStatus::Processing,
        MessageStatus::Completed,
        MessageStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Completed => "completed",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }

    /// Legal moves of the lifecycle state machine.
    ///
    /// `Processing -> Pending` covers both the retry path and the
    /// reclaim of messages held by a dead worker.
    pub fn can_transition_to(&self, to: MessageStatus) -> bool {
        matches!(
            (self, to),
            (MessageStatus::Pending, MessageStatus::Processing)
                | (MessageStatus::Processing, MessageStatus::Completed)
                | (MessageStatus::Processing, MessageStatus::Failed)
                | (MessageStatus::Processing, MessageStatus::Pending)
        )
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(MessageStatus::Pending),
            "processing" => Ok(MessageStatus::Processing),
            "completed" => Ok(MessageStatus::Completed),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Outcome of a failure report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget left: message is back in the dispatch pool
    Retry,
    /// Budget spent: message is terminally failed
    Exhausted,
}

/// Identity of one dispatch: which worker claimed the message and when.
///
/// A worker reporting through its receipt can only settle its own attempt,
/// never a later re-claim of the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub message_id: MessageId,
    pub worker_id: Option<WorkerId>,
    pub claimed_at: i64,
}

/// Enqueue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub queue_id: QueueId,
    pub payload: String,

    #[serde(default)]
    pub priority: Priority,

    /// Epoch ms before which the message is not dispatched
    #[serde(default)]
    pub scheduled_at: Option<i64>,

    /// `None` or `Some(0)` falls back to `DEFAULT_MAX_RETRIES`
    #[serde(default)]
    pub max_retries: Option<i32>,
}

impl NewMessage {
    pub fn new(queue_id: QueueId, payload: impl Into<String>) -> Self {
        Self {
            queue_id,
            payload: payload.into(),
            priority: 0,
            scheduled_at: None,
            max_retries: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn scheduled_at(mut self, at_millis: i64) -> Self {
        self.scheduled_at = Some(at_millis);
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Message Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub queue_id: QueueId,
    pub payload: String,
    pub priority: Priority,
    pub status: MessageStatus,

    pub scheduled_at: Option<i64>,
    /// Claim time of the current (or last) attempt
    pub processed_at: Option<i64>,
    pub failed_at: Option<i64>,

    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,

    /// Worker holding the current claim
    pub worker_id: Option<WorkerId>,

    pub created_at: i64, // epoch ms
    pub updated_at: i64,
}

impl Message {
    /// Build a pending message from an enqueue request.
    ///
    /// The id is 0 until the store assigns one.
    pub fn from_request(req: NewMessage, now_millis: i64) -> Self {
        let max_retries = match req.max_retries {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_RETRIES,
        };

        Self {
            id: 0,
            queue_id: req.queue_id,
            payload: req.payload,
            priority: req.priority,
            status: MessageStatus::Pending,
            scheduled_at: req.scheduled_at,
            processed_at: None,
            failed_at: None,
            retry_count: 0,
            max_retries,
            error_message: None,
            worker_id: None,
            created_at: now_millis,
            updated_at: now_millis,
        }
    }

    /// Dispatchable at `now_millis`?
    pub fn is_eligible(&self, now_millis: i64) -> bool {
        self.status == MessageStatus::Pending
            && self.scheduled_at.map_or(true, |at| at <= now_millis)
    }

    fn transition(&mut self, to: MessageStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Pending -> Processing (dispatch claim)
    pub fn claim(&mut self, worker_id: Option<WorkerId>, now_millis: i64) -> Result<()> {
        self.transition(MessageStatus::Processing)?;
        self.processed_at = Some(now_millis);
        self.worker_id = worker_id;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Processing -> Completed
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(MessageStatus::Completed)?;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Processing -> Failed, or back to Pending while retries remain
    pub fn fail(&mut self, error: Option<String>, now_millis: i64) -> Result<RetryDecision> {
        if self.status != MessageStatus::Processing {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: MessageStatus::Failed,
            });
        }

        self.retry_count += 1;
        self.failed_at = Some(now_millis);
        self.updated_at = now_millis;
        if let Some(error) = error.filter(|e| !e.is_empty()) {
            self.error_message = Some(error);
        }

        if self.retry_count < self.max_retries {
            self.status = MessageStatus::Pending;
            self.processed_at = None;
            self.worker_id = None;
            Ok(RetryDecision::Retry)
        } else {
            self.status = MessageStatus::Failed;
            Ok(RetryDecision::Exhausted)
        }
    }

    /// Processing -> Pending without spending a retry (owner presumed dead)
    pub fn release(&mut self, now_millis: i64) -> Result<()> {
        if self.status != MessageStatus::Processing {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: MessageStatus::Pending,
            });
        }
        self.status = MessageStatus::Pending;
        self.processed_at = None;
        self.worker_id = None;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Receipt of the current claim, if the message is processing
    pub fn receipt(&self) -> Option<ClaimReceipt> {
        match (self.status, self.processed_at) {
            (MessageStatus::Processing, Some(claimed_at)) => Some(ClaimReceipt {
                message_id: self.id,
                worker_id: self.worker_id,
                claimed_at,
            }),
            _ => None,
        }
    }

    /// Does the current claim match `receipt`?
    pub fn is_held_by(&self, receipt: &ClaimReceipt) -> bool {
        self.receipt().as_ref() == Some(receipt)
    }

    /// Milliseconds spent since the claim, if the message was claimed
    pub fn processing_millis(&self, now_millis: i64) -> Option<i64> {
        self.processed_at.map(|at| (now_millis - at).max(0))
    }
}
