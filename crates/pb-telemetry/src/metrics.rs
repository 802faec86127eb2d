//! Prometheus metrics for the payment broker.
//!
//! All metrics follow the naming convention: `pb_broker_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Encoder, Histogram, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Committed broker operations by method
    pub static ref BROKER_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("pb_broker_operations_total", "Broker messages applied and committed"),
        &["method"]
    ).expect("metric creation failed");

    /// Rejected broker operations by method and error kind
    pub static ref BROKER_REJECTIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("pb_broker_rejections_total", "Broker messages rejected without effect"),
        &["method", "reason"]
    ).expect("metric creation failed");

    /// Time spent applying one message
    pub static ref BROKER_APPLY_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "pb_broker_apply_duration_seconds",
            "Time spent validating and committing one broker message"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle proving the collectors were registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BROKER_OPERATIONS.clone()),
        Box::new(BROKER_REJECTIONS.clone()),
        Box::new(BROKER_APPLY_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count one committed operation.
pub fn record_operation(method: &str) {
    BROKER_OPERATIONS.with_label_values(&[method]).inc();
}

/// Count one rejected operation.
pub fn record_rejection(method: &str, reason: &str) {
    BROKER_REJECTIONS.with_label_values(&[method, reason]).inc();
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
