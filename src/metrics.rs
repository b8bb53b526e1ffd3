//! Prometheus metrics registry and instruments.
//!
//! This module is layer-agnostic and can be used from any component.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Sync Metrics
    pub static ref SYNC_CYCLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lagoon_sync_cycles_total", "Total number of sync cycles run"),
        &["component", "status"]
    ).expect("metric can be created");
    pub static ref PULLS_SUPPRESSED_TOTAL: IntCounter = IntCounter::new(
        "lagoon_pulls_suppressed_total",
        "Message pulls skipped because a pull was already in flight"
    ).expect("metric can be created");
    pub static ref RECONCILIATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lagoon_reconciliations_total", "Optimistic values discarded for an authoritative remote read"),
        &["component"]
    ).expect("metric can be created");
    pub static ref ECHOES_RETRACTED_TOTAL: IntCounter = IntCounter::new(
        "lagoon_echoes_retracted_total",
        "Optimistic message echoes retracted after a failed send"
    ).expect("metric can be created");

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lagoon_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lagoon_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("lagoon_cache_size", "Current number of items in cache"),
        &["cache_name"]
    ).expect("metric can be created");

    // Content Metrics
    pub static ref FEED_ITEMS: IntGauge = IntGauge::new(
        "lagoon_feed_items",
        "Items in the merged feed after the last refresh"
    ).expect("metric can be created");
    pub static ref MEDIA_REJECTED_TOTAL: IntCounter = IntCounter::new(
        "lagoon_media_rejected_total",
        "Media reference lists rejected during normalization"
    ).expect("metric can be created");
    pub static ref STORIES_EXPIRED_TOTAL: IntCounter = IntCounter::new(
        "lagoon_stories_expired_total",
        "Stories dropped by the 24-hour window on refresh"
    ).expect("metric can be created");
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "lagoon_media_uploads_total",
        "Total number of media uploads"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lagoon_errors_total", "Total number of errors"),
        &["error_type", "component"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(SYNC_CYCLES_TOTAL.clone()))
        .expect("SYNC_CYCLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PULLS_SUPPRESSED_TOTAL.clone()))
        .expect("PULLS_SUPPRESSED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RECONCILIATIONS_TOTAL.clone()))
        .expect("RECONCILIATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ECHOES_RETRACTED_TOTAL.clone()))
        .expect("ECHOES_RETRACTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_SIZE.clone()))
        .expect("CACHE_SIZE can be registered");
    REGISTRY
        .register(Box::new(FEED_ITEMS.clone()))
        .expect("FEED_ITEMS can be registered");
    REGISTRY
        .register(Box::new(MEDIA_REJECTED_TOTAL.clone()))
        .expect("MEDIA_REJECTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORIES_EXPIRED_TOTAL.clone()))
        .expect("STORIES_EXPIRED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MEDIA_UPLOADS_TOTAL.clone()))
        .expect("MEDIA_UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
