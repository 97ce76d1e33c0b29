//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found no live entry, including callers that waited on
    /// another caller's parse
    pub misses: u64,
    pub load_successes: u64,
    pub load_failures: u64,
    pub evictions: u64,
    /// Time spent inside the parser across all loads
    pub total_load_time: Duration,
}

impl CacheStats {
    pub const fn request_count(&self) -> u64 {
        self.hits + self.misses
    }

    pub const fn load_count(&self) -> u64 {
        self.load_successes + self.load_failures
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.request_count();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Mean parser time per load
    pub fn average_load_penalty(&self) -> Duration {
        match u32::try_from(self.load_count()) {
            Ok(0) => Duration::ZERO,
            Ok(loads) => self.total_load_time / loads,
            Err(_) => Duration::from_secs_f64(
                self.total_load_time.as_secs_f64() / self.load_count() as f64,
            ),
        }
    }
}

/// Lock-free counters updated on the cache's hot path
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
    total_load_nanos: AtomicU64,
}

impl StatsCounter {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_success(&self, elapsed: Duration) {
        self.load_successes.fetch_add(1, Ordering::Relaxed);
        self.add_load_time(elapsed);
    }

    pub fn record_load_failure(&self, elapsed: Duration) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        self.add_load_time(elapsed);
    }

    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    fn add_load_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_load_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            load_successes: self.load_successes.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_load_time: Duration::from_nanos(self.total_load_nanos.load(Ordering::Relaxed)),
        }
    }
}
