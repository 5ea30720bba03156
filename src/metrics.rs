// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

// NOTE: When observability feature is disabled, the macros below swallow their
// arguments so call sites compile unchanged.
#[cfg(not(feature = "observability"))]
pub enum Unit {}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value $(, $label, $label_value)*);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $desc:expr) => {{
        let _ = ($name, $desc);
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {{
        let _ = ($name, $desc);
    }};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram};

use std::time::Duration;

/// Registers descriptions for every metric emitted by the SDK.
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(
        "metadata_cache_hits_total",
        "Metadata reads served without running a build, by layer (memory, store)."
    );
    describe_counter!(
        "metadata_cache_miss_total",
        "Metadata reads that found nothing in the store and required a build."
    );
    describe_counter!(
        "metadata_builds_total",
        "Metadata builds by protocol and outcome (success, failure)."
    );
    describe_histogram!(
        "metadata_build_duration_seconds",
        Unit::Seconds,
        "Wall time of a metadata build including persistence."
    );
    describe_counter!(
        "adapter_rpc_calls_total",
        "Live contract reads issued by adapters, by method."
    );
}

pub fn increment_cache_hit(layer: &str) {
    counter!("metadata_cache_hits_total", 1, "layer" => layer.to_string());
}

pub fn increment_cache_miss(protocol: &str) {
    counter!("metadata_cache_miss_total", 1, "protocol" => protocol.to_string());
}

pub fn increment_metadata_build(protocol: &str, outcome: &'static str) {
    counter!(
        "metadata_builds_total",
        1,
        "protocol" => protocol.to_string(),
        "outcome" => outcome
    );
}

pub fn record_metadata_build_duration(protocol: &str, duration: Duration) {
    histogram!(
        "metadata_build_duration_seconds",
        duration.as_secs_f64(),
        "protocol" => protocol.to_string()
    );
}

pub fn increment_rpc_call(method: &str) {
    counter!("adapter_rpc_calls_total", 1, "method" => method.to_string());
}
