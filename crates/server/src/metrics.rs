//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the vlibrary server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Refresh coordinator and ledger gauges (collected dynamically)
//! - Core metrics registered from `vlibrary_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use vlibrary_core::refresh::RefreshPhase;
use vlibrary_core::{ItemState, LedgerFilter, MediaKind};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vlibrary_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vlibrary_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vlibrary_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Coordinator Metrics (collected dynamically)
// =============================================================================

/// Coordinator running state (1 = running, 0 = stopped).
pub static COORDINATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vlibrary_coordinator_running",
        "Whether the refresh coordinator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Refresh phase per kind (0 = idle, 1 = pending, 2 = running).
pub static REFRESH_PHASE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("vlibrary_refresh_phase", "Current phase of each refresh kind"),
        &["kind"],
    )
    .unwrap()
});

/// Shows queued for an episode refresh.
pub static PENDING_SHOWS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "vlibrary_refresh_pending_shows",
        "Shows queued for an episode refresh",
    )
    .unwrap()
});

// =============================================================================
// Ledger Metrics (collected dynamically)
// =============================================================================

/// Ledger records by kind and state.
pub static LEDGER_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("vlibrary_ledger_items", "Ledger records by kind and state"),
        &["kind", "state"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Coordinator
    registry
        .register(Box::new(COORDINATOR_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(REFRESH_PHASE.clone())).unwrap();
    registry.register(Box::new(PENDING_SHOWS.clone())).unwrap();

    // Ledger
    registry.register(Box::new(LEDGER_ITEMS.clone())).unwrap();

    // Core metrics (refresh runs, sync items, removals, sweep)
    for metric in vlibrary_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the coordinator and ledger as
/// they are now.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Some(coordinator) = state.coordinator() {
        let status = coordinator.status();
        COORDINATOR_RUNNING.set(if status.running { 1 } else { 0 });
        PENDING_SHOWS.set(status.pending_shows as i64);
        for kind in status.kinds {
            let value = match kind.phase {
                RefreshPhase::Idle => 0,
                RefreshPhase::Pending => 1,
                RefreshPhase::Running => 2,
            };
            REFRESH_PHASE
                .with_label_values(&[kind.kind.as_str()])
                .set(value);
        }
    }

    if let Some(library) = state.library() {
        for kind in [MediaKind::Movie, MediaKind::Show, MediaKind::Episode] {
            for item_state in [ItemState::Active, ItemState::Deleted] {
                let filter = LedgerFilter::new().with_kind(kind).with_state(item_state);
                if let Ok(items) = library.list_items(&filter) {
                    let label = match item_state {
                        ItemState::Active => "active",
                        ItemState::Deleted => "deleted",
                    };
                    LEDGER_ITEMS
                        .with_label_values(&[kind.as_str(), label])
                        .set(items.len() as i64);
                }
            }
        }
    }
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace ids with placeholders).
pub fn normalize_path(path: &str) -> String {
    // Matches consume the trailing slash, so adjacent ids need a second pass.
    let result = NUMERIC_SEGMENT.replace_all(path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
