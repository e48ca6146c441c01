// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling the pipeline from the backend.

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopSink;

/// A sink for metrics of the endorse and order pipeline.
pub trait PipelineMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of one endorsement call, labeled by peer.
    fn observe_endorsement_latency(&self, peer: &str, duration_secs: f64);
    /// Increments a counter of endorsement outcomes (`ok`, `rejected`, `timeout`, `transport`).
    fn inc_endorsements(&self, outcome: &'static str);
    /// Increments a counter of broadcasts, labeled by the orderer status.
    fn inc_broadcasts(&self, status: i32);
    /// Sets the gauge of endorsement calls currently in flight.
    fn set_endorsements_in_flight(&self, count: usize);
}
impl PipelineMetricsSink for NopSink {
    fn observe_endorsement_latency(&self, _peer: &str, _duration_secs: f64) {}
    fn inc_endorsements(&self, _outcome: &'static str) {}
    fn inc_broadcasts(&self, _status: i32) {}
    fn set_endorsements_in_flight(&self, _count: usize) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by operation and error code.
    fn inc_error(&self, function_name: &'static str, code: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _function_name: &'static str, _code: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink: PipelineMetricsSink + ErrorMetricsSink {
    /// Upcasts to the pipeline sink.
    fn pipeline(&self) -> &dyn PipelineMetricsSink;
    /// Upcasts to the error sink.
    fn errors(&self) -> &dyn ErrorMetricsSink;
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T
where
    T: PipelineMetricsSink + ErrorMetricsSink,
{
    fn pipeline(&self) -> &dyn PipelineMetricsSink {
        self
    }

    fn errors(&self) -> &dyn ErrorMetricsSink {
        self
    }
}
