//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("takosu_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Long-poll Metrics
    pub static ref ACTIVE_LONG_POLLS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("takosu_active_long_polls", "Long-poll requests currently held open"),
        &["feed"]
    ).expect("metric can be created");
    pub static ref LONG_POLL_WAIT_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "takosu_long_poll_wait_seconds",
            "Time a long-poll request waited before returning"
        ).buckets(vec![0.05, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 30.0]),
        &["feed", "outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("takosu_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACTIVE_LONG_POLLS.clone()))
        .expect("ACTIVE_LONG_POLLS can be registered");
    REGISTRY
        .register(Box::new(LONG_POLL_WAIT_SECONDS.clone()))
        .expect("LONG_POLL_WAIT_SECONDS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
