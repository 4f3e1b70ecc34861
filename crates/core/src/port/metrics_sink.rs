// Observability Sink Port
//
// Fire-and-forget: a dropped observation never affects engine correctness.

/// Receives counters, gauges and duration observations from the engine
pub trait MetricsSink: Send + Sync {
    /// Count a message event, keyed by (queue name, status)
    fn increment_message_counter(&self, queue_name: &str, status: &str);

    /// Current number of messages of a queue in a status
    fn set_queue_depth(&self, queue_name: &str, status: &str, depth: f64);

    /// Claim-to-outcome duration in seconds
    fn observe_processing_time(&self, queue_name: &str, seconds: f64);
}

/// Sink that discards everything (default wiring, tests)
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn increment_message_counter(&self, _queue_name: &str, _status: &str) {}

    fn set_queue_depth(&self, _queue_name: &str, _status: &str, _depth: f64) {}

    fn observe_processing_time(&self, _queue_name: &str, _seconds: f64) {}
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Sink that keeps every observation for assertions
    #[derive(Default)]
    pub struct RecordingMetricsSink {
        counters: Mutex<HashMap<(String, String), u64>>,
        depths: Mutex<HashMap<(String, String), f64>>,
        durations: Mutex<Vec<(String, f64)>>,
    }

    impl RecordingMetricsSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn counter(&self, queue_name: &str, status: &str) -> u64 {
            let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            counters
                .get(&(queue_name.to_string(), status.to_string()))
                .copied()
                .unwrap_or(0)
        }

        pub fn depth(&self, queue_name: &str, status: &str) -> Option<f64> {
            let depths = self.depths.lock().unwrap_or_else(|e| e.into_inner());
            depths
                .get(&(queue_name.to_string(), status.to_string()))
                .copied()
        }

        pub fn durations(&self, queue_name: &str) -> Vec<f64> {
            let durations = self.durations.lock().unwrap_or_else(|e| e.into_inner());
            durations
                .iter()
                .filter(|(q, _)| q == queue_name)
                .map(|(_, secs)| *secs)
                .collect()
        }
    }

    impl MetricsSink for RecordingMetricsSink {
        fn increment_message_counter(&self, queue_name: &str, status: &str) {
            let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
            *counters
                .entry((queue_name.to_string(), status.to_string()))
                .or_insert(0) += 1;
        }

        fn set_queue_depth(&self, queue_name: &str, status: &str, depth: f64) {
            let mut depths = self.depths.lock().unwrap_or_else(|e| e.into_inner());
            depths.insert((queue_name.to_string(), status.to_string()), depth);
        }

        fn observe_processing_time(&self, queue_name: &str, seconds: f64) {
            let mut durations = self.durations.lock().unwrap_or_else(|e| e.into_inner());
            durations.push((queue_name.to_string(), seconds));
        }
    }
}
