//! Statement cache metrics published through the `metrics` facade
//!
//! Nothing is exported unless the host installs a recorder.

use std::sync::Once;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::dialect::DatabaseType;

const METRIC_CACHE_HITS: &str = "sql_statement_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "sql_statement_cache_misses_total";
const METRIC_LOAD_FAILURES: &str = "sql_statement_cache_load_failures_total";
const METRIC_CACHE_EVICTIONS: &str = "sql_statement_cache_evictions_total";
const METRIC_LOAD_DURATION: &str = "sql_statement_cache_load_duration_seconds";
const METRIC_CACHE_SIZE: &str = "sql_statement_cache_entries";

const LABEL_DATABASE_TYPE: &str = "database_type";

static DESCRIBED: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Runs once per process; later calls are no-ops.
pub fn describe_metrics() {
    DESCRIBED.call_once(|| {
        describe_counter!(METRIC_CACHE_HITS, "Lookups answered from a cached statement");
        describe_counter!(METRIC_CACHE_MISSES, "Lookups that required or awaited a parse");
        describe_counter!(METRIC_LOAD_FAILURES, "Parses that returned an error");
        describe_counter!(METRIC_CACHE_EVICTIONS, "Cached statements evicted");
        describe_histogram!(METRIC_LOAD_DURATION, "Time spent parsing on a cache miss");
        describe_gauge!(METRIC_CACHE_SIZE, "Live cached statements");
    });
}

/// Record a cache hit.
pub fn record_cache_hit(database_type: DatabaseType) {
    counter!(METRIC_CACHE_HITS, LABEL_DATABASE_TYPE => database_type.as_str()).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss(database_type: DatabaseType) {
    counter!(METRIC_CACHE_MISSES, LABEL_DATABASE_TYPE => database_type.as_str()).increment(1);
}

/// Record one parser invocation.
pub fn record_load(database_type: DatabaseType, duration: Duration, success: bool) {
    histogram!(
        METRIC_LOAD_DURATION,
        LABEL_DATABASE_TYPE => database_type.as_str(),
        "status" => if success { "success" } else { "error" },
    )
    .record(duration.as_secs_f64());

    if !success {
        counter!(METRIC_LOAD_FAILURES, LABEL_DATABASE_TYPE => database_type.as_str())
            .increment(1);
    }
}

pub fn record_cache_evictions(database_type: DatabaseType, count: usize) {
    counter!(METRIC_CACHE_EVICTIONS, LABEL_DATABASE_TYPE => database_type.as_str())
        .increment(count as u64);
}

/// Update cache size gauge.
pub fn set_cache_size(database_type: DatabaseType, size: usize) {
    gauge!(METRIC_CACHE_SIZE, LABEL_DATABASE_TYPE => database_type.as_str()).set(size as f64);
}
