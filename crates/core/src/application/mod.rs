// Application Layer - Use Cases and Engine Services

mod depth;
pub mod dispatcher;
pub mod engine;
pub mod lifecycle;
pub mod maintenance;
pub mod message_service;
pub mod queue_service;
pub mod worker;

// Re-exports
pub use dispatcher::Dispatcher;
pub use engine::{Engine, EnginePorts};
pub use lifecycle::{LifecycleService, Outcome};
pub use maintenance::MaintenanceScheduler;
pub use message_service::{MessageFilter, MessageService};
pub use queue_service::QueueService;
pub use worker::{
    shutdown_channel, LivenessSweeper, ShutdownSender, ShutdownToken, SweepReport, WorkerService,
};
