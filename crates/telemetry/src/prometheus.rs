// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.
//!
//! Collectors live in a registry owned by the sink, so several clients in one
//! process do not collide.

use crate::sinks::{ErrorMetricsSink, PipelineMetricsSink};
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// A metrics sink backed by its own Prometheus registry.
#[derive(Debug, Clone)]
pub struct PrometheusSink {
    registry: Registry,
    endorsement_latency: HistogramVec,
    endorsements_total: IntCounterVec,
    broadcasts_total: IntCounterVec,
    endorsements_in_flight: IntGauge,
    errors_total: IntCounterVec,
}

impl PrometheusSink {
    /// Creates and registers all collectors.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("stitch".into()), None)?;

        let endorsement_latency = HistogramVec::new(
            HistogramOpts::new(
                "endorsement_duration_seconds",
                "Latency of endorsement calls.",
            )
            .buckets(exponential_buckets(0.005, 2.0, 14)?),
            &["peer"],
        )?;
        let endorsements_total = IntCounterVec::new(
            Opts::new("endorsements_total", "Endorsement calls by outcome."),
            &["outcome"],
        )?;
        let broadcasts_total = IntCounterVec::new(
            Opts::new("broadcasts_total", "Broadcasts by orderer status."),
            &["status"],
        )?;
        let endorsements_in_flight = IntGauge::new(
            "endorsements_in_flight",
            "Endorsement calls currently in flight.",
        )?;
        let errors_total = IntCounterVec::new(
            Opts::new("errors_total", "Failed operations by function and error code."),
            &["function", "code"],
        )?;

        registry.register(Box::new(endorsement_latency.clone()))?;
        registry.register(Box::new(endorsements_total.clone()))?;
        registry.register(Box::new(broadcasts_total.clone()))?;
        registry.register(Box::new(endorsements_in_flight.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            registry,
            endorsement_latency,
            endorsements_total,
            broadcasts_total,
            endorsements_in_flight,
            errors_total,
        })
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders all metrics in the text exposition format.
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl PipelineMetricsSink for PrometheusSink {
    fn observe_endorsement_latency(&self, peer: &str, duration_secs: f64) {
        self.endorsement_latency
            .with_label_values(&[peer])
            .observe(duration_secs);
    }
    fn inc_endorsements(&self, outcome: &'static str) {
        self.endorsements_total.with_label_values(&[outcome]).inc();
    }
    fn inc_broadcasts(&self, status: i32) {
        self.broadcasts_total
            .with_label_values(&[&status.to_string()])
            .inc();
    }
    fn set_endorsements_in_flight(&self, count: usize) {
        self.endorsements_in_flight
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, function_name: &'static str, code: &'static str) {
        self.errors_total
            .with_label_values(&[function_name, code])
            .inc();
    }
}
