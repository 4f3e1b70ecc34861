// Engine - wires every service over one set of ports

use crate::application::{
    Dispatcher, LifecycleService, LivenessSweeper, MessageService, QueueService, WorkerService,
};
use crate::port::{
    MessageRepository, MetricsSink, QueueRepository, TimeProvider, TransactionalStore,
    WorkerRepository,
};
use std::sync::Arc;

/// Collaborators shared by all services
#[derive(Clone)]
pub struct EnginePorts {
    pub queues: Arc<dyn QueueRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub workers: Arc<dyn WorkerRepository>,
    pub store: Arc<dyn TransactionalStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub time_provider: Arc<dyn TimeProvider>,
}

/// Operation surface of the engine
pub struct Engine {
    pub queues: QueueService,
    pub messages: MessageService,
    pub dispatcher: Dispatcher,
    pub lifecycle: LifecycleService,
    pub workers: WorkerService,
    ports: EnginePorts,
}

impl Engine {
    pub fn new(ports: EnginePorts) -> Self {
        let p = ports.clone();
        Self {
            queues: QueueService::new(p.queues.clone(), p.store.clone(), p.time_provider.clone()),
            messages: MessageService::new(
                p.messages.clone(),
                p.queues.clone(),
                p.metrics.clone(),
                p.time_provider.clone(),
            ),
            dispatcher: Dispatcher::new(
                p.messages.clone(),
                p.queues.clone(),
                p.workers.clone(),
                p.metrics.clone(),
                p.time_provider.clone(),
            ),
            lifecycle: LifecycleService::new(
                p.messages.clone(),
                p.queues.clone(),
                p.store.clone(),
                p.metrics.clone(),
                p.time_provider.clone(),
            ),
            workers: WorkerService::new(p.workers.clone(), p.queues, p.time_provider),
            ports,
        }
    }

    /// Liveness sweeper over the same ports (default thresholds)
    pub fn liveness_sweeper(&self) -> LivenessSweeper {
        LivenessSweeper::new(
            self.ports.workers.clone(),
            self.ports.messages.clone(),
            self.ports.store.clone(),
            self.ports.time_provider.clone(),
        )
    }
}
