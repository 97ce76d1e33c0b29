//! Partitioned, bounded cache of parsed statements with single-flight loading

use std::fmt;
use std::hash::{BuildHasher, RandomState};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::key::CacheKey;
use super::loading::Loading;
use super::segment::{Evicted, Lookup, Segment};
use super::stats::{CacheStats, StatsCounter};
use crate::config::{CacheOption, Config};
use crate::dialect::DatabaseType;
use crate::parser::SqlParser;
use crate::{Error, Result};

/// Smallest partition worth splitting off
const MIN_ENTRIES_PER_SEGMENT: usize = 20;
const MAX_SEGMENTS: usize = 1 << 16;

/// Thread-safe cache from SQL text to parsed statement.
///
/// Each instance is bound to one dialect, one comment mode and one parser.
/// Keys are spread over power-of-two partitions, each an LRU guarded by its
/// own lock; the partition capacities sum to exactly `maximum_size`.
///
/// # Loading
///
/// On a miss exactly one caller runs the parser, outside any partition lock.
/// Concurrent callers for the same SQL text block until it finishes and all
/// receive the same `Arc` or the same error. Failures are never cached.
///
/// # Memory Budget
///
/// With a memory budget configured, each entry weighs its SQL length plus
/// [`SqlParser::statement_weight`]. A partition exceeding its share of the
/// budget evicts least-recently-used entries. [`StatementCache::reclaim`]
/// lets the host release memory on demand.
pub struct StatementCache<P: SqlParser> {
    parser: P,
    database_type: DatabaseType,
    sql_comment_parse_enabled: bool,
    option: CacheOption,
    segments: Box<[Segment<P::Statement>]>,
    hasher: RandomState,
    stats: StatsCounter,
    reclaim_cursor: AtomicUsize,
}

impl<P: SqlParser> fmt::Debug for StatementCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCache")
            .field("database_type", &self.database_type)
            .field("sql_comment_parse_enabled", &self.sql_comment_parse_enabled)
            .field("option", &self.option)
            .field("segment_count", &self.segments.len())
            .field("entry_count", &self.len())
            .finish_non_exhaustive()
    }
}

impl<P: SqlParser> StatementCache<P> {
    /// Create a cache bound to the configured dialect and comment mode.
    pub fn new(config: &Config, parser: P) -> Result<Self> {
        config.validate()?;
        let option = config.cache;

        let maximum_size = usize::try_from(option.maximum_size)
            .map_err(|_| Error::config("maximum_size exceeds addressable entries"))?;
        let segment_count = segment_count(
            option.concurrency_level,
            maximum_size,
            option.memory_budget,
        );

        let segments = (0..segment_count)
            .map(|index| -> Result<Segment<P::Statement>> {
                let capacity = share(maximum_size, segment_count, index);
                let capacity = NonZeroUsize::new(capacity)
                    .ok_or_else(|| Error::config("maximum_size too small for partitioning"))?;
                let initial = share(option.initial_capacity, segment_count, index);
                let initial = NonZeroUsize::new(initial).unwrap_or(NonZeroUsize::MIN);
                let budget = option
                    .memory_budget
                    .map(|budget| share(budget, segment_count, index));
                Ok(Segment::new(initial, capacity, budget))
            })
            .collect::<Result<Box<[_]>>>()?;

        #[cfg(feature = "metrics")]
        crate::observability::describe_metrics();

        tracing::debug!(
            database_type = %config.database_type,
            sql_comment_parse_enabled = config.sql_comment_parse_enabled,
            maximum_size,
            initial_capacity = option.initial_capacity,
            segment_count,
            memory_budget = ?option.memory_budget,
            "Statement cache created"
        );

        Ok(Self {
            parser,
            database_type: config.database_type,
            sql_comment_parse_enabled: config.sql_comment_parse_enabled,
            option,
            segments,
            hasher: RandomState::new(),
            stats: StatsCounter::default(),
            reclaim_cursor: AtomicUsize::new(0),
        })
    }

    /// Return the parsed statement for `sql`, parsing it on a miss.
    pub fn get(&self, sql: &str) -> Result<Arc<P::Statement>> {
        self.get_inner(sql, None)
    }

    /// Like [`get`](Self::get), but a caller waiting on another caller's
    /// parse gives up after `timeout` with [`Error::Timeout`].
    ///
    /// The caller that runs the parser is never interrupted; its result is
    /// still stored for later lookups.
    pub fn get_with_timeout(&self, sql: &str, timeout: Duration) -> Result<Arc<P::Statement>> {
        self.get_inner(sql, Some(timeout))
    }

    fn get_inner(&self, sql: &str, timeout: Option<Duration>) -> Result<Arc<P::Statement>> {
        let span = tracing::debug_span!(
            "statement_cache.get",
            database_type = %self.database_type,
            sql.len = sql.len()
        );
        let _entered = span.enter();

        let segment = self.segment_for(sql);
        match segment.lookup_or_claim(sql) {
            Lookup::Hit(statement) => {
                self.stats.record_hit();
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_hit(self.database_type);
                tracing::trace!(cache.result = "hit");
                Ok(statement)
            }
            Lookup::Wait(loading) => {
                self.stats.record_miss();
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_miss(self.database_type);
                tracing::trace!(cache.result = "wait");
                match timeout {
                    Some(timeout) => loading.wait_timeout(timeout),
                    None => loading.wait(),
                }
            }
            Lookup::Load(loading) => {
                self.stats.record_miss();
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_miss(self.database_type);
                tracing::trace!(cache.result = "miss");
                self.load(segment, sql, &loading)
            }
        }
    }

    fn load(
        &self,
        segment: &Segment<P::Statement>,
        sql: &str,
        loading: &Loading<P::Statement>,
    ) -> Result<Arc<P::Statement>> {
        let guard = AbandonGuard {
            segment,
            sql,
            loading,
        };

        let started = Instant::now();
        let parsed = self
            .parser
            .parse(self.database_type, sql, self.sql_comment_parse_enabled)
            .map(|statement| {
                let weight = sql
                    .len()
                    .saturating_add(self.parser.statement_weight(&statement));
                (Arc::new(statement), weight)
            });
        let elapsed = started.elapsed();
        std::mem::forget(guard);

        #[cfg(feature = "metrics")]
        crate::observability::record_load(self.database_type, elapsed, parsed.is_ok());

        let outcome = match parsed {
            Ok((statement, weight)) => {
                let evicted = segment.finish_load(sql, Some((Arc::clone(&statement), weight)));
                self.stats.record_load_success(elapsed);
                self.record_evictions(evicted);
                #[cfg(feature = "metrics")]
                crate::observability::set_cache_size(self.database_type, self.len());
                tracing::debug!(
                    elapsed_us = elapsed.as_micros() as u64,
                    weight,
                    evicted = evicted.entries,
                    "Statement parsed and cached"
                );
                Ok(statement)
            }
            Err(e) => {
                segment.finish_load(sql, None);
                self.stats.record_load_failure(elapsed);
                tracing::debug!(error = %e, "Statement parse failed");
                Err(Error::Parse(e))
            }
        };

        loading.complete(outcome.clone());
        outcome
    }

    fn record_evictions(&self, evicted: Evicted) {
        if evicted.entries == 0 {
            return;
        }
        self.stats.record_evictions(evicted.entries);
        tracing::trace!(
            evicted = evicted.entries,
            released_weight = evicted.weight,
            "Evicted cached statements"
        );
        #[cfg(feature = "metrics")]
        crate::observability::record_cache_evictions(self.database_type, evicted.entries);
    }

    fn segment_for(&self, sql: &str) -> &Segment<P::Statement> {
        let hash = self.hasher.hash_one(sql) as usize;
        &self.segments[hash & (self.segments.len() - 1)]
    }

    /// Return the cached statement without parsing on a miss.
    pub fn get_if_present(&self, sql: &str) -> Option<Arc<P::Statement>> {
        let statement = self.segment_for(sql).get_if_present(sql);
        if statement.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        statement
    }

    /// Whether a live entry exists, without refreshing its recency
    pub fn contains(&self, sql: &str) -> bool {
        self.segment_for(sql).contains(sql)
    }

    /// Discard the entry for `sql`; in-flight parses are unaffected.
    pub fn invalidate(&self, sql: &str) -> bool {
        let removed = self.segment_for(sql).invalidate(sql);
        if removed {
            tracing::debug!(sql.len = sql.len(), "Invalidated cached statement");
        }
        removed
    }

    /// Discard every live entry; in-flight parses are unaffected.
    pub fn invalidate_all(&self) {
        let removed: usize = self.segments.iter().map(Segment::clear).sum();
        tracing::debug!(removed, "Invalidated all cached statements");
    }

    /// Release at least `weight` units of cached statements, least recently
    /// used first within each partition.
    ///
    /// Returns the number of entries evicted. Intended to be called when the
    /// host observes memory pressure.
    pub fn reclaim(&self, weight: usize) -> usize {
        let start = self.reclaim_cursor.fetch_add(1, Ordering::Relaxed);
        let count = self.segments.len();
        let mut total = Evicted::default();

        for offset in 0..count {
            if total.weight >= weight {
                break;
            }
            let segment = &self.segments[(start + offset) % count];
            let evicted = segment.reclaim(weight - total.weight);
            total.entries += evicted.entries;
            total.weight += evicted.weight;
        }

        self.record_evictions(total);
        #[cfg(feature = "metrics")]
        if total.entries > 0 {
            crate::observability::set_cache_size(self.database_type, self.len());
        }
        tracing::debug!(
            requested = weight,
            released = total.weight,
            evicted = total.entries,
            "Reclaimed statement cache memory"
        );
        total.entries
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total weight of live entries
    pub fn weighted_size(&self) -> usize {
        self.segments.iter().map(Segment::weight).sum()
    }

    /// Keys of live entries; most recently used first within each partition
    pub fn cached_keys(&self) -> Vec<CacheKey> {
        self.segments
            .iter()
            .flat_map(Segment::keys)
            .map(|sql| CacheKey::new(sql, self.sql_comment_parse_enabled))
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub const fn parser(&self) -> &P {
        &self.parser
    }

    pub const fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    pub const fn sql_comment_parse_enabled(&self) -> bool {
        self.sql_comment_parse_enabled
    }

    pub const fn cache_option(&self) -> &CacheOption {
        &self.option
    }

    pub const fn maximum_size(&self) -> u64 {
        self.option.maximum_size
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[cfg(test)]
    pub(crate) fn segments(&self) -> &[Segment<P::Statement>] {
        &self.segments
    }
}

/// Publishes [`Error::LoadAbandoned`] if the parser unwinds.
///
/// Forgotten once the parser returns, so a completed load never runs this.
struct AbandonGuard<'a, S> {
    segment: &'a Segment<S>,
    sql: &'a str,
    loading: &'a Loading<S>,
}

impl<S> Drop for AbandonGuard<'_, S> {
    fn drop(&mut self) {
        self.segment.finish_load(self.sql, None);
        self.loading.complete(Err(Error::LoadAbandoned));
        tracing::warn!(sql.len = self.sql.len(), "Statement parse abandoned");
    }
}

/// Partition count: the concurrency level rounded up to a power of two,
/// without letting any partition drop below `MIN_ENTRIES_PER_SEGMENT` or
/// below one unit of memory budget.
fn segment_count(
    concurrency_level: usize,
    maximum_size: usize,
    memory_budget: Option<usize>,
) -> usize {
    let mut count = 1usize;
    while count < concurrency_level
        && count < MAX_SEGMENTS
        && (count << 1).saturating_mul(MIN_ENTRIES_PER_SEGMENT) <= maximum_size
        && memory_budget.is_none_or(|budget| count << 1 <= budget)
    {
        count <<= 1;
    }
    count
}

/// Portion of `total` given to partition `index`; portions sum to `total`.
const fn share(total: usize, parts: usize, index: usize) -> usize {
    total / parts + (index < total % parts) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FnParser;

    #[test]
    fn test_segment_count_small_cache_uses_single_segment() {
        assert_eq!(segment_count(4, 2, None), 1);
        assert_eq!(segment_count(4, 39, None), 1);
    }

    #[test]
    fn test_segment_count_rounds_up_to_power_of_two() {
        assert_eq!(segment_count(3, 65535, None), 4);
        assert_eq!(segment_count(4, 65535, None), 4);
        assert_eq!(segment_count(5, 65535, None), 8);
        assert_eq!(segment_count(1, 65535, None), 1);
    }

    #[test]
    fn test_segment_count_keeps_minimum_entries_per_segment() {
        assert_eq!(segment_count(16, 40, None), 2);
        assert_eq!(segment_count(16, 80, None), 4);
        assert_eq!(segment_count(16, 79, None), 2);
    }

    #[test]
    fn test_segment_count_is_capped() {
        assert_eq!(segment_count(usize::MAX, usize::MAX, None), MAX_SEGMENTS);
    }

    #[test]
    fn test_segment_count_keeps_one_budget_unit_per_segment() {
        assert_eq!(segment_count(8, 65535, Some(3)), 2);
        assert_eq!(segment_count(8, 65535, Some(1)), 1);
        assert_eq!(segment_count(8, 65535, Some(8)), 8);
        assert_eq!(segment_count(8, 65535, Some(1 << 20)), 8);
    }

    #[test]
    fn test_share_sums_to_total() {
        for (total, parts) in [(65535, 4), (10, 3), (7, 8), (40, 2)] {
            let sum: usize = (0..parts).map(|i| share(total, parts, i)).sum();
            assert_eq!(sum, total);
        }
        assert_eq!(share(10, 3, 0), 4);
        assert_eq!(share(10, 3, 2), 3);
    }

    #[test]
    fn test_segment_capacities_sum_to_maximum_size() {
        let config = Config::builder()
            .maximum_size(1003)
            .concurrency_level(8)
            .build()
            .unwrap();
        let cache = StatementCache::new(
            &config,
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap();

        assert_eq!(cache.segment_count(), 8);
        let total: usize = cache.segments().iter().map(Segment::capacity).sum();
        assert_eq!(total, 1003);
    }

    #[test]
    fn test_small_memory_budget_is_not_inflated() {
        let config = Config::builder()
            .concurrency_level(8)
            .memory_budget(Some(3))
            .build()
            .unwrap();
        let cache = StatementCache::new(
            &config,
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap();

        assert_eq!(cache.segment_count(), 2);
        let budgets: Vec<_> = cache.segments().iter().map(Segment::weight_budget).collect();
        assert_eq!(budgets, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_initial_capacity_presizes_segments() {
        let config = Config::builder()
            .initial_capacity(10)
            .maximum_size(1000)
            .concurrency_level(4)
            .build()
            .unwrap();
        let cache = StatementCache::new(
            &config,
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap();

        let allocated: Vec<_> = cache.segments().iter().map(Segment::allocated).collect();
        assert_eq!(allocated, vec![3, 3, 2, 2]);
        let capacities: Vec<_> = cache.segments().iter().map(Segment::capacity).collect();
        assert_eq!(capacities, vec![250, 250, 250, 250]);
    }

    #[test]
    fn test_tiny_initial_capacity_still_allocates_each_segment() {
        let config = Config::builder()
            .initial_capacity(1)
            .concurrency_level(4)
            .build()
            .unwrap();
        let cache = StatementCache::new(
            &config,
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap();

        assert!(cache.segments().iter().all(|segment| segment.allocated() == 1));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config {
            cache: CacheOption {
                maximum_size: 0,
                ..CacheOption::new()
            },
            ..Config::default()
        };
        let err = StatementCache::new(
            &config,
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_debug_impl() {
        let cache = StatementCache::new(
            &Config::default(),
            FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(())),
        )
        .unwrap();
        let debug_str = format!("{cache:?}");
        assert!(debug_str.contains("StatementCache"));
        assert!(debug_str.contains("MySql"));
        assert!(debug_str.contains("65535"));
    }
}
