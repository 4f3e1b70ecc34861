// Queue depth gauges

use crate::domain::{MessageStatus, Queue};
use crate::port::{MessageRepository, MetricsSink};
use tracing::warn;

/// Publish per-status depth gauges for a queue.
///
/// Failures are logged and swallowed: gauges never fail an operation.
pub(crate) async fn publish_queue_depth(
    messages: &dyn MessageRepository,
    metrics: &dyn MetricsSink,
    queue: &Queue,
) {
    for status in MessageStatus::ALL {
        match messages.count_by_status(queue.id, status).await {
            Ok(depth) => metrics.set_queue_depth(&queue.name, status.as_str(), depth as f64),
            Err(e) => {
                warn!(queue = %queue.name, error = %e, "Failed to refresh queue depth");
                return;
            }
        }
    }
}
