//! One independently locked partition of the statement cache

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::loading::Loading;

/// Live cache entry
struct Entry<S> {
    statement: Arc<S>,
    weight: usize,
}

/// Outcome of looking a SQL text up in a segment
pub(crate) enum Lookup<S> {
    /// A live entry exists
    Hit(Arc<S>),
    /// Another caller is parsing this text
    Wait(Arc<Loading<S>>),
    /// The caller was elected to parse this text and must finish or abandon it
    Load(Arc<Loading<S>>),
}

/// Entries evicted by one mutation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Evicted {
    pub entries: usize,
    pub weight: usize,
}

struct SegmentState<S> {
    entries: LruCache<Arc<str>, Entry<S>>,
    /// Hard entry limit; the LRU table starts smaller and grows towards it
    capacity: NonZeroUsize,
    loading: HashMap<Arc<str>, Arc<Loading<S>>>,
    weight: usize,
    weight_budget: Option<usize>,
}

impl<S> SegmentState<S> {
    fn over_budget(&self) -> bool {
        self.weight_budget.is_some_and(|budget| self.weight > budget)
    }

    fn pop_lru(&mut self) -> Option<usize> {
        let (_, victim) = self.entries.pop_lru()?;
        self.weight = self.weight.saturating_sub(victim.weight);
        Some(victim.weight)
    }

    /// Double the LRU table when it is full but still below `capacity`.
    fn grow_if_full(&mut self) {
        let allocated = self.entries.cap();
        if self.entries.len() < allocated.get() || allocated >= self.capacity {
            return;
        }
        let grown = allocated.saturating_add(allocated.get());
        self.entries.resize(grown.min(self.capacity));
    }

    fn insert(&mut self, key: Arc<str>, entry: Entry<S>) -> Evicted {
        if let Some(previous) = self.entries.pop(&key) {
            self.weight = self.weight.saturating_sub(previous.weight);
        }
        self.grow_if_full();

        self.weight = self.weight.saturating_add(entry.weight);
        let mut evicted = Evicted::default();

        // Bounded LRU hands back its least-recently-used entry when full
        if let Some((_, victim)) = self.entries.push(key, entry) {
            self.weight = self.weight.saturating_sub(victim.weight);
            evicted.entries += 1;
            evicted.weight += victim.weight;
        }

        while self.over_budget() {
            let Some(weight) = self.pop_lru() else { break };
            evicted.entries += 1;
            evicted.weight += weight;
        }

        evicted
    }
}

/// LRU partition plus the in-flight loads for keys hashing to it
pub(crate) struct Segment<S> {
    state: Mutex<SegmentState<S>>,
}

impl<S> Segment<S> {
    /// Create a segment holding at most `capacity` entries, with room for
    /// `initial` of them allocated up front.
    pub fn new(
        initial: NonZeroUsize,
        capacity: NonZeroUsize,
        weight_budget: Option<usize>,
    ) -> Self {
        Self {
            state: Mutex::new(SegmentState {
                entries: LruCache::new(initial.min(capacity)),
                capacity,
                loading: HashMap::new(),
                weight: 0,
                weight_budget,
            }),
        }
    }

    /// Return the live entry, join an in-flight load, or claim the load.
    pub fn lookup_or_claim(&self, sql: &str) -> Lookup<S> {
        let mut state = self.state.lock();

        if let Some(entry) = state.entries.get(sql) {
            return Lookup::Hit(Arc::clone(&entry.statement));
        }

        if let Some(loading) = state.loading.get(sql) {
            return Lookup::Wait(Arc::clone(loading));
        }

        let loading = Arc::new(Loading::new());
        state.loading.insert(Arc::from(sql), Arc::clone(&loading));
        Lookup::Load(loading)
    }

    /// Release a claimed load, storing the statement when one was produced.
    ///
    /// Removal of the in-flight slot and insertion of the entry happen under
    /// one lock, so no caller can observe the key as absent in between.
    pub fn finish_load(&self, sql: &str, loaded: Option<(Arc<S>, usize)>) -> Evicted {
        let mut state = self.state.lock();
        let key = state
            .loading
            .remove_entry(sql)
            .map_or_else(|| Arc::from(sql), |(key, _)| key);

        match loaded {
            Some((statement, weight)) => state.insert(key, Entry { statement, weight }),
            None => Evicted::default(),
        }
    }

    pub fn get_if_present(&self, sql: &str) -> Option<Arc<S>> {
        self.state
            .lock()
            .entries
            .get(sql)
            .map(|entry| Arc::clone(&entry.statement))
    }

    /// Presence check that leaves recency untouched
    pub fn contains(&self, sql: &str) -> bool {
        self.state.lock().entries.contains(sql)
    }

    pub fn invalidate(&self, sql: &str) -> bool {
        let mut state = self.state.lock();
        match state.entries.pop(sql) {
            Some(entry) => {
                state.weight = state.weight.saturating_sub(entry.weight);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.weight = 0;
        removed
    }

    /// Evict least-recently-used entries until `target` weight is released.
    pub fn reclaim(&self, target: usize) -> Evicted {
        let mut state = self.state.lock();
        let mut evicted = Evicted::default();
        while evicted.weight < target {
            let Some(weight) = state.pop_lru() else { break };
            evicted.entries += 1;
            evicted.weight += weight;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn weight(&self) -> usize {
        self.state.lock().weight
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity.get()
    }

    /// Entries the LRU table currently has room for
    #[cfg(test)]
    pub fn allocated(&self) -> usize {
        self.state.lock().entries.cap().get()
    }

    #[cfg(test)]
    pub fn weight_budget(&self) -> Option<usize> {
        self.state.lock().weight_budget
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|(key, _)| Arc::clone(key))
            .collect()
    }

    #[cfg(test)]
    pub fn loading_count(&self) -> usize {
        self.state.lock().loading.len()
    }
}
