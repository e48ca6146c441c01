// Path: crates/telemetry/src/time.rs
use crate::sinks::PipelineMetricsSink;
use std::time::Instant;

/// Records endorsement latency for `peer` when dropped.
pub struct Timer<'a> {
    sink: &'a dyn PipelineMetricsSink,
    peer: &'a str,
    start: Instant,
}

impl<'a> Timer<'a> {
    /// Starts timing.
    pub fn new(sink: &'a dyn PipelineMetricsSink, peer: &'a str) -> Self {
        Self {
            sink,
            peer,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_endorsement_latency(self.peer, self.start.elapsed().as_secs_f64());
    }
}
