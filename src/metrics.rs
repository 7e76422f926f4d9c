// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the zone worker.
//!
//! All metrics share the `zone_worker` namespace prefix.
//!
//! # Metrics Categories
//!
//! - **Zone action metrics** - end-to-end outcome and duration of `ZoneAction`
//! - **Target metrics** - per-target backend calls
//! - **Propagation metrics** - poll consensus and NOTIFY sends
//! - **Maintenance metrics** - shard recovery and zone exports
//! - **Error metrics** - errors by operation and kind
//!
//! # Example
//!
//! ```rust,no_run
//! use zone_worker::metrics::record_zone_action;
//! use zone_worker::zone::Action;
//!
//! record_zone_action(Action::Create, true, std::time::Duration::from_secs(12));
//! ```

use crate::zone::{Action, ExportStatus, Status};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all zone worker metrics
const METRICS_NAMESPACE: &str = "zone_worker";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Zone Action Metrics
// ============================================================================

/// Total number of zone actions by action and outcome
///
/// Labels:
/// - `action`: `create`, `update`, `delete`
/// - `outcome`: `success`, `failure`
pub static ZONE_ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_actions_total"),
        "Total number of zone actions by action and outcome",
    );
    let counter = CounterVec::new(opts, &["action", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of zone actions in seconds, including propagation delay and polling
///
/// Labels:
/// - `action`: `create`, `update`, `delete`
pub static ZONE_ACTION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_zone_action_duration_seconds"),
        "Duration of zone actions in seconds by action",
    )
    .buckets(vec![0.1, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]);
    let histogram = HistogramVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of backend calls against pool targets
///
/// Labels:
/// - `action`: `create`, `update`, `delete`
/// - `outcome`: `success`, `failure`
pub static TARGET_ACTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_target_actions_total"),
        "Total number of backend calls against pool targets by action and outcome",
    );
    let counter = CounterVec::new(opts, &["action", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Propagation Metrics
// ============================================================================

/// Total number of poll outcomes by resulting zone status
///
/// Labels:
/// - `status`: `SUCCESS`, `ERROR`, `NO_ZONE`
pub static POLL_RESULTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_poll_results_total"),
        "Total number of nameserver poll outcomes by resulting zone status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of NOTIFY messages by outcome
///
/// Labels:
/// - `outcome`: `sent`, `disabled`, `failure`
pub static NOTIFY_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_notify_total"),
        "Total number of NOTIFY messages by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Maintenance Metrics
// ============================================================================

/// Total number of zones re-dispatched by shard recovery
///
/// Labels:
/// - `action`: `create`, `update`, `delete`
pub static RECOVERY_DISPATCHED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_recovery_dispatched_total"),
        "Total number of zones re-dispatched by shard recovery by action",
    );
    let counter = CounterVec::new(opts, &["action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of zone exports by final status
///
/// Labels:
/// - `status`: `complete`, `error`
pub static EXPORTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_exports_total"),
        "Total number of zone exports by final status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by operation and error kind
///
/// Labels:
/// - `operation`: where the error surfaced (e.g. `update_status`, `load_pool`)
/// - `kind`: [`WorkerError::kind`](crate::errors::WorkerError::kind)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by operation and kind",
    );
    let counter = CounterVec::new(opts, &["operation", "kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Recording Helpers
// ============================================================================

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record the end of a zone action
pub fn record_zone_action(action: Action, success: bool, duration: Duration) {
    ZONE_ACTIONS_TOTAL
        .with_label_values(&[action.as_label(), outcome(success)])
        .inc();
    ZONE_ACTION_DURATION_SECONDS
        .with_label_values(&[action.as_label()])
        .observe(duration.as_secs_f64());
}

/// Record the final outcome of one target's backend call (after retries)
pub fn record_target_action(action: Action, success: bool) {
    TARGET_ACTIONS_TOTAL
        .with_label_values(&[action.as_label(), outcome(success)])
        .inc();
}

/// Record the zone status computed from a poll
pub fn record_poll_result(status: Status) {
    POLL_RESULTS_TOTAL
        .with_label_values(&[&status.to_string()])
        .inc();
}

/// Record a NOTIFY attempt (`sent`, `disabled` or `failure`)
pub fn record_notify(outcome: &str) {
    NOTIFY_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a zone re-dispatched by shard recovery
pub fn record_recovery_dispatch(action: Action) {
    RECOVERY_DISPATCHED_TOTAL
        .with_label_values(&[action.as_label()])
        .inc();
}

/// Record a finished zone export
pub fn record_export(status: ExportStatus) {
    EXPORTS_TOTAL.with_label_values(&[status.as_label()]).inc();
}

/// Record an error
pub fn record_error(operation: &str, kind: &str) {
    ERRORS_TOTAL.with_label_values(&[operation, kind]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
