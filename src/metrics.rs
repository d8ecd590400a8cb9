// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_gauge, gauge, increment_counter, Unit};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

// Macros for metrics when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

// Macros for describe_* functions when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

// Re-export macros for use in this module when observability is disabled
#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_gauge, gauge, increment_counter};

/// Initializes the descriptions for all the metrics in the application.
/// This should be called once at startup.
pub fn describe_metrics() {
    // Cache metrics
    describe_counter!(
        "cache_hits_total",
        Unit::Count,
        "Total cache hits, labeled by cache name."
    );
    describe_counter!(
        "cache_miss_total",
        Unit::Count,
        "Total cache misses, labeled by cache name."
    );
    describe_gauge!(
        "cache_size_gauge",
        "Current size of a cache, labeled by cache name."
    );
    describe_counter!(
        "sdk_fetch_joins_total",
        Unit::Count,
        "Total reads that joined an already in-flight fetch instead of starting a new one."
    );

    // Connection metrics
    describe_counter!(
        "sdk_snapshots_published_total",
        Unit::Count,
        "Total dependency snapshots published to subscribers."
    );

    // Transaction metrics
    describe_counter!(
        "sdk_transactions_submitted_total",
        Unit::Count,
        "Total transactions accepted by the wallet and submitted, labeled by action."
    );
    describe_counter!(
        "sdk_transactions_confirmed_total",
        Unit::Count,
        "Total submitted transactions that mined successfully, labeled by action."
    );
    describe_counter!(
        "sdk_transactions_failed_total",
        Unit::Count,
        "Total transactions rejected, reverted, or dropped, labeled by action."
    );
}

// --- Helper functions to update metrics ---

pub fn increment_cache_hit(cache_name: &str) {
    counter!("cache_hits_total", 1, "cache" => cache_name.to_string());
}

pub fn increment_cache_miss(cache_name: &str) {
    counter!("cache_miss_total", 1, "cache" => cache_name.to_string());
}

pub fn set_cache_size(cache_name: &str, size: f64) {
    gauge!("cache_size_gauge", size, "cache" => cache_name.to_string());
}

pub fn increment_fetch_join() {
    increment_counter!("sdk_fetch_joins_total");
}

pub fn increment_snapshot_published() {
    increment_counter!("sdk_snapshots_published_total");
}

pub fn increment_mutation_submitted(action: &str) {
    counter!("sdk_transactions_submitted_total", 1, "action" => action.to_string());
}

pub fn increment_mutation_succeeded(action: &str) {
    counter!("sdk_transactions_confirmed_total", 1, "action" => action.to_string());
}

pub fn increment_mutation_failed(action: &str) {
    counter!("sdk_transactions_failed_total", 1, "action" => action.to_string());
}
