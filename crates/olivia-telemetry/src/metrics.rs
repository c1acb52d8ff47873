//! Prometheus metrics for Olivia tools.
//!
//! All metrics follow the naming convention: `olivia_<area>_<metric>_<unit>`
//!
//! The bet client registers its own metrics in the Prometheus default
//! registry (feature `metrics`); [`encode_metrics`] renders both.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Tool metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Status object transitions observed by a tool, by target status
    pub static ref STATUS_TRANSITIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("olivia_status_transitions_total", "Status object transitions observed"),
        &["status"]
    ).expect("metric creation failed");

    /// JSON-RPC account probe latency
    pub static ref RPC_PROBE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "olivia_rpc_probe_duration_seconds",
            "Time spent on getAccountInfo probes"
        ).buckets(exponential_buckets(0.005, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Register all metrics with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(STATUS_TRANSITIONS.clone()),
        Box::new(RPC_PROBE_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Count a status transition.
pub fn record_status_transition(status: &str) {
    STATUS_TRANSITIONS.with_label_values(&[status]).inc();
}

/// Encode tool and default-registry metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut metric_families = REGISTRY.gather();
    metric_families.extend(prometheus::gather());
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_transition_counted_and_encoded() {
        register_metrics().unwrap();
        record_status_transition("waiting");
        assert!(STATUS_TRANSITIONS.with_label_values(&["waiting"]).get() >= 1);
        let text = encode_metrics().unwrap();
        assert!(text.contains("olivia_status_transitions_total"));
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let before = RPC_PROBE_DURATION.get_sample_count();
        drop(HistogramTimer::new(&RPC_PROBE_DURATION));
        assert!(RPC_PROBE_DURATION.get_sample_count() > before);
    }
}
