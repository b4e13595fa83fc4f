//! Metrics for observability
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the binary installs a recorder.

use metrics::{describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register descriptions for every broker metric
pub fn init_metrics() {
    describe_counter!(
        "broker.authenticate.total",
        "Authenticate calls, labelled by result"
    );
    describe_counter!("broker.rooms.created", "Rooms registered successfully");
    describe_counter!("broker.rooms.failed", "CreateRoom calls that failed");
    describe_counter!(
        "broker.qos.decisions",
        "SelectQos decisions, labelled by acceptance"
    );

    describe_counter!(
        "registry.create.conflicts",
        "Generated room ids that were already taken"
    );
    describe_histogram!(
        "registry.create.duration_ms",
        "Room registration duration in milliseconds"
    );
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
