// Queue Domain Model

use serde::{Deserialize, Serialize};

/// Queue identifier (store-assigned row id)
pub type QueueId = i64;

/// Queue definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub description: String,
    /// Free-form tag: fifo, priority, delay, ...
    pub queue_type: String,
    /// Opaque configuration blob (JSON by convention)
    pub config: String,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Queue creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQueue {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub queue_type: String,
    #[serde(default)]
    pub config: String,
}

impl NewQueue {
    pub fn new(name: impl Into<String>, queue_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue_type: queue_type.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }
}

/// Partial update; `None` leaves the field untouched. The name is immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueUpdate {
    pub description: Option<String>,
    pub queue_type: Option<String>,
    pub config: Option<String>,
    pub is_active: Option<bool>,
}

impl Queue {
    pub fn apply(&mut self, update: QueueUpdate, now_millis: i64) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(queue_type) = update.queue_type {
            self.queue_type = queue_type;
        }
        if let Some(config) = update.config {
            self.config = config;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now_millis;
    }
}
