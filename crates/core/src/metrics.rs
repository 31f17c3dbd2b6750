//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Refresh coordinator (runs per kind, durations)
//! - List sync (per-item outcomes)
//! - Removal queue and maintenance sweep

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Refresh Coordinator
// =============================================================================

/// Refresh runs by kind and result.
pub static REFRESH_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vlibrary_refresh_runs_total", "Total refresh runs"),
        &["kind", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Refresh duration in seconds.
pub static REFRESH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vlibrary_refresh_duration_seconds",
            "Duration of refresh runs",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// List Sync
// =============================================================================

/// List entries processed by outcome.
pub static SYNC_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vlibrary_sync_items_total", "List entries processed by sync"),
        &["list", "outcome"], // "added", "duplicate", "removed", "unchanged", "unresolved", "failed"
    )
    .unwrap()
});

// =============================================================================
// Removal and Maintenance
// =============================================================================

/// Removal queue flushes by mode.
pub static REMOVAL_FLUSHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vlibrary_removal_flushes_total",
            "Removal queue flushes that processed events",
        ),
        &["mode"], // "single", "batch"
    )
    .unwrap()
});

/// Episode bursts promoted to a full show removal.
pub static SHOWS_PROMOTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vlibrary_removal_shows_promoted_total",
        "Removal bursts promoted to a full show removal",
    )
    .unwrap()
});

/// Deleted ledger records cleared by the maintenance sweep.
pub static SWEEP_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "vlibrary_sweep_removed_total",
        "Deleted ledger records cleared by the maintenance sweep",
    )
    .unwrap()
});

/// Every core metric, for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(REFRESH_RUNS.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(SYNC_ITEMS.clone()),
        Box::new(REMOVAL_FLUSHES.clone()),
        Box::new(SHOWS_PROMOTED.clone()),
        Box::new(SWEEP_REMOVED.clone()),
    ]
}
