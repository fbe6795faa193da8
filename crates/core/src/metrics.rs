//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Request execution (attempts, retries, duration)
//! - Sync (runs by source, record churn, skipped items)
//! - Like toggles and searches

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Request Execution
// =============================================================================

/// Request attempts by outcome.
pub static REQUEST_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_request_attempts_total", "Total request attempts"),
        &["outcome"], // "success", "client_error", "server_error", "transport_error", "offline"
    )
    .unwrap()
});

/// Retries by reason.
pub static REQUEST_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_request_retries_total", "Total request retries"),
        &["reason"], // "server_error", "rate_limited", "transport_error", "unauthorized"
    )
    .unwrap()
});

/// Duration of a full execute call, retries included.
pub static REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "cookbook_request_duration_seconds",
            "Duration of request execution including retries",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method"],
    )
    .unwrap()
});

/// Token fetches from the identity provider.
pub static TOKEN_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_token_fetches_total", "Identity provider fetches"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Sync
// =============================================================================

/// Sync runs by result source.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_sync_runs_total", "Total sync runs"),
        &["source"], // "remote", "cache", "failed"
    )
    .unwrap()
});

/// Records changed by sync.
pub static SYNC_RECORDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_sync_records_total", "Records changed by sync"),
        &["change"], // "added", "updated", "removed"
    )
    .unwrap()
});

/// Remote items skipped as malformed.
pub static SYNC_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cookbook_sync_skipped_total",
        "Remote items skipped as malformed",
    )
    .unwrap()
});

// =============================================================================
// Likes & Search
// =============================================================================

/// Like toggles by outcome.
pub static LIKE_TOGGLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_like_toggles_total", "Total like toggles"),
        &["outcome"], // "confirmed", "rolled_back", "noop", "rejected"
    )
    .unwrap()
});

/// Searches by terminal phase.
pub static SEARCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cookbook_searches_total", "Total searches"),
        &["phase"], // "success", "local_only", "superseded"
    )
    .unwrap()
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(REQUEST_ATTEMPTS.clone()),
        Box::new(REQUEST_RETRIES.clone()),
        Box::new(REQUEST_DURATION.clone()),
        Box::new(TOKEN_FETCHES.clone()),
        Box::new(SYNC_RUNS.clone()),
        Box::new(SYNC_RECORDS.clone()),
        Box::new(SYNC_SKIPPED.clone()),
        Box::new(LIKE_TOGGLES.clone()),
        Box::new(SEARCHES.clone()),
    ]
}
