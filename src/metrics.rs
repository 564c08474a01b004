//! Prometheus metrics for allocator activity
//!
//! Counters are process-wide and shared by every allocator instance.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Once;
use tracing::error;

lazy_static::lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    pub static ref ALLOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabmem_allocations_total", "Slots handed out"),
        &["slot_size"]
    ).unwrap();

    pub static ref RELEASES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabmem_releases_total", "Slots returned"),
        &["slot_size"]
    ).unwrap();

    pub static ref BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabmem_batches_total", "Batches created"),
        &["slot_size"]
    ).unwrap();

    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("slabmem_errors_total", "Rejected requests by kind"),
        &["kind"]
    ).unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry
pub fn init_metrics() {
    REGISTER.call_once(|| {
        METRICS_REGISTRY.register(Box::new(ALLOCATIONS_TOTAL.clone())).ok();
        METRICS_REGISTRY.register(Box::new(RELEASES_TOTAL.clone())).ok();
        METRICS_REGISTRY.register(Box::new(BATCHES_TOTAL.clone())).ok();
        METRICS_REGISTRY.register(Box::new(ERRORS_TOTAL.clone())).ok();
    });
}

pub fn record_allocation(slot_size: usize) {
    ALLOCATIONS_TOTAL
        .with_label_values(&[slot_size.to_string().as_str()])
        .inc();
}

pub fn record_release(slot_size: usize) {
    RELEASES_TOTAL
        .with_label_values(&[slot_size.to_string().as_str()])
        .inc();
}

pub fn record_batch(slot_size: usize) {
    BATCHES_TOTAL
        .with_label_values(&[slot_size.to_string().as_str()])
        .inc();
}

pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> String {
    init_metrics();

    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|_| String::from("# Error converting metrics\n"))
}
