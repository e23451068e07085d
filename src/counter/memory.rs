//! In-memory counter store implementation using `DashMap`.
//!
//! This is the default backend - data is lost on process restart.

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use super::{CounterKey, CounterStore, Histogram};
use crate::{Error, Result};

/// Per-key state: each participant's current count plus the histogram of
/// those counts. Both are mutated together under the key's shard lock.
#[derive(Debug, Default)]
struct KeyCounters {
    frequencies: FxHashMap<String, u64>,
    histogram: Histogram,
}

/// In-memory histogram counter store using lock-free concurrent hashmap.
///
/// Every mutation holds the `DashMap` entry for its key for the whole
/// bucket move, so updates to one key are serialized while different keys
/// proceed in parallel.
///
/// # Example
///
/// ```rust
/// use trueno_experiments::counter::{CounterKey, CounterStore, MemoryCounterStore};
///
/// # async fn example() -> trueno_experiments::Result<()> {
/// let store = MemoryCounterStore::new();
/// let key = CounterKey::goal("exp", "blue", "signup");
/// store.increment(&key, "user-1", 2).await?;
/// assert_eq!(store.get_frequency(&key, "user-1").await?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<CounterKey, KeyCounters>,
}

impl MemoryCounterStore {
    /// Create a new in-memory counter store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity for `capacity` keys.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counters: DashMap::with_capacity(capacity),
        }
    }

    /// Number of keys ever incremented.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Check if no key was ever incremented.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drop every counter.
    pub fn clear_all(&self) {
        self.counters.clear();
    }
}

impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &CounterKey, participant: &str, amount: u64) -> Result<u64> {
        if amount == 0 {
            return self.get_frequency(key, participant).await;
        }

        let mut entry = self.counters.entry(key.clone()).or_default();
        let counters = entry.value_mut();

        let previous = counters.frequencies.get(participant).copied().unwrap_or(0);
        let next = previous.checked_add(amount).ok_or_else(|| {
            Error::Other(format!("counter overflow for '{participant}' on {key}"))
        })?;

        if previous > 0 {
            counters.histogram.remove_one(previous);
        }
        counters.histogram.add(next, 1);
        counters.frequencies.insert(participant.to_string(), next);

        tracing::debug!(%key, participant, previous, next, "incremented counter");
        Ok(next)
    }

    async fn get(&self, key: &CounterKey) -> Result<u64> {
        Ok(self
            .counters
            .get(key)
            .map_or(0, |c| c.value().histogram.participants()))
    }

    async fn get_frequency(&self, key: &CounterKey, participant: &str) -> Result<u64> {
        Ok(self
            .counters
            .get(key)
            .and_then(|c| c.value().frequencies.get(participant).copied())
            .unwrap_or(0))
    }

    async fn get_frequencies(&self, key: &CounterKey) -> Result<Histogram> {
        Ok(self
            .counters
            .get(key)
            .map(|c| c.value().histogram.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, key: &CounterKey, participant: &str) -> Result<bool> {
        let Some(mut entry) = self.counters.get_mut(key) else {
            return Ok(false);
        };
        let counters = entry.value_mut();

        let Some(previous) = counters.frequencies.remove(participant) else {
            return Ok(false);
        };
        counters.histogram.remove_one(previous);

        tracing::debug!(%key, participant, previous, "cleared participant counter");
        Ok(true)
    }
}
