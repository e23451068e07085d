//! Action-count histograms
//!
//! A histogram maps "number of actions one participant performed" to
//! "number of participants with exactly that count". Buckets are kept in a
//! `BTreeMap` so iteration is always ascending by action count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Action count → participant population.
///
/// Empty buckets are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram {
    buckets: BTreeMap<u64, u64>,
}

impl Histogram {
    /// Create an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Population of the bucket at `actions` (0 if absent).
    #[must_use]
    pub fn get(&self, actions: u64) -> u64 {
        self.buckets.get(&actions).copied().unwrap_or(0)
    }

    /// Add `participants` to the bucket at `actions`.
    pub fn add(&mut self, actions: u64, participants: u64) {
        if participants > 0 {
            *self.buckets.entry(actions).or_insert(0) += participants;
        }
    }

    /// Remove one participant from the bucket at `actions`, dropping the
    /// bucket when it empties. Returns `false` if the bucket was empty.
    pub fn remove_one(&mut self, actions: u64) -> bool {
        match self.buckets.get_mut(&actions) {
            Some(population) if *population > 1 => {
                *population -= 1;
                true
            }
            Some(_) => {
                self.buckets.remove(&actions);
                true
            }
            None => false,
        }
    }

    /// Total participants across all buckets.
    #[must_use]
    pub fn participants(&self) -> u64 {
        self.buckets.values().sum()
    }

    /// Total actions across all participants.
    #[must_use]
    pub fn total_actions(&self) -> u128 {
        self.buckets
            .iter()
            .map(|(&actions, &population)| u128::from(actions) * u128::from(population))
            .sum()
    }

    /// Ascending `(actions, population)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.buckets.iter().map(|(&k, &v)| (k, v))
    }

    /// Ascending action counts with a non-zero population.
    pub fn action_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.buckets.keys().copied()
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Check if the histogram has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Reconstruct the implicit zero bucket.
    ///
    /// Participants counted in `participants` but absent from this histogram
    /// performed zero actions; they are added to bucket 0. This is a derived
    /// view and is never written back to a store.
    #[must_use]
    pub fn fixup(&self, participants: u64) -> Self {
        let mut fixed = self.clone();
        let zeros = participants.saturating_sub(self.participants());
        fixed.add(0, zeros);
        fixed
    }
}

impl FromIterator<(u64, u64)> for Histogram {
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (actions, participants) in iter {
            histogram.add(actions, participants);
        }
        histogram
    }
}

impl<const N: usize> From<[(u64, u64); N]> for Histogram {
    fn from(pairs: [(u64, u64); N]) -> Self {
        pairs.into_iter().collect()
    }
}
