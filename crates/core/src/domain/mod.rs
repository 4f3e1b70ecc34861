// Domain Layer - Pure business logic and entities

pub mod error;
pub mod message;
pub mod queue;
pub mod worker;

// Re-exports
pub use error::DomainError;
pub use message::{
    ClaimReceipt, Message, MessageId, MessageStatus, NewMessage, Priority, RetryDecision, DEFAULT_MAX_RETRIES,
};
pub use queue::{NewQueue, Queue, QueueId, QueueUpdate};
pub use worker::{Worker, WorkerId, WorkerStatus};
