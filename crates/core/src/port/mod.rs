// Port Layer - Interfaces for external collaborators (store, clock, metrics)

pub mod maintenance;
pub mod message_repository;
pub mod metrics_sink;
pub mod queue_repository;
pub mod time_provider;
pub mod transaction;
pub mod worker_repository;

// Re-exports
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceReport, MaintenanceStats};
pub use message_repository::MessageRepository;
pub use metrics_sink::{MetricsSink, NoopMetricsSink};
pub use queue_repository::QueueRepository;
pub use time_provider::TimeProvider;
pub use transaction::{StoreTransaction, Transaction, TransactionalStore};
pub use worker_repository::WorkerRepository;
