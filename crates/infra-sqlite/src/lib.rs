// Qafka Infrastructure - SQLite Adapter
// Implements: QueueRepository, MessageRepository, WorkerRepository,
// TransactionalStore, Maintenance

mod connection;
mod maintenance_impl;
mod message_repository;
mod migration;
mod queue_repository;
mod store;
mod transaction;
mod worker_repository;

pub use connection::create_pool;
pub use maintenance_impl::SqliteMaintenance;
pub use message_repository::SqliteMessageRepository;
pub use migration::run_migrations;
pub use queue_repository::SqliteQueueRepository;
pub use store::SqliteStore;
pub use transaction::SqliteStoreTransaction;
pub use worker_repository::SqliteWorkerRepository;

// Note: sqlx::Error conversion lives in `store::map_sqlx_error`
// (orphan rules forbid `From<sqlx::Error> for AppError` here)
