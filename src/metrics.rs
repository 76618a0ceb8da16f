//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Federation Metrics
    pub static ref HUB_PINGS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_hub_pings_total", "Total number of hub publish notifications"),
        &["result"]
    ).expect("metric can be created");
    pub static ref PUSH_ENTRIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_push_entries_total", "Total number of pushed Atom entries processed"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref PUSH_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_push_requests_total", "Total number of inbound push requests"),
        &["result"]
    ).expect("metric can be created");
    pub static ref CHALLENGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_challenges_total", "Total number of hub verification challenges answered"),
        &["result"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tidepool_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HUB_PINGS_TOTAL.clone()))
        .expect("HUB_PINGS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PUSH_ENTRIES_TOTAL.clone()))
        .expect("PUSH_ENTRIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PUSH_REQUESTS_TOTAL.clone()))
        .expect("PUSH_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CHALLENGES_TOTAL.clone()))
        .expect("CHALLENGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
