//! Histogram Counter Store
//!
//! Counts are tracked per participant, not as a running total: each key holds
//! the full distribution of "how many times did each participant act",
//! which the Mann-Whitney test needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use trueno_experiments::counter::{CounterKey, CounterStore, MemoryCounterStore};
//!
//! # async fn example() -> trueno_experiments::Result<()> {
//! let store = MemoryCounterStore::new();
//! let key = CounterKey::goal("exp", "blue", "signup");
//!
//! store.increment(&key, "alice", 1).await?;
//! store.increment(&key, "alice", 1).await?;
//! store.increment(&key, "bob", 1).await?;
//!
//! assert_eq!(store.get(&key).await?, 2);
//! let histogram = store.get_frequencies(&key).await?;
//! assert_eq!(histogram.get(1), 1);
//! assert_eq!(histogram.get(2), 1);
//!
//! store.clear(&key, "alice").await?;
//! assert_eq!(store.get_frequency(&key, "alice").await?, 0);
//! # Ok(())
//! # }
//! ```

mod histogram;
mod key;
mod memory;

pub use histogram::Histogram;
pub use key::{CounterKey, Metric};
pub use memory::MemoryCounterStore;

use crate::{Error, Result};
use std::future::Future;

/// Per-participant histogram counter store.
///
/// Implementations must make `increment` and `clear` atomic per
/// (key, participant): moving a participant from bucket `n` to bucket
/// `n + amount` is one transition, never a read followed by a write.
/// Backends built on optimistic primitives report unresolved contention as
/// `Error::ConcurrencyConflict`; see [`retry_on_conflict`].
pub trait CounterStore: Send + Sync {
    /// Add `amount` to the participant's count and return the new count.
    ///
    /// An `amount` of zero never changes state.
    fn increment(
        &self,
        key: &CounterKey,
        participant: &str,
        amount: u64,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Number of participants represented under `key`.
    fn get(&self, key: &CounterKey) -> impl Future<Output = Result<u64>> + Send;

    /// The participant's current count, or 0 if absent.
    fn get_frequency(
        &self,
        key: &CounterKey,
        participant: &str,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Snapshot of the full histogram under `key`.
    fn get_frequencies(&self, key: &CounterKey) -> impl Future<Output = Result<Histogram>> + Send;

    /// Remove the participant's contribution. Returns `false` if there was none.
    fn clear(&self, key: &CounterKey, participant: &str)
        -> impl Future<Output = Result<bool>> + Send;

    /// Clear the participant under several keys.
    ///
    /// Returns the number of keys the participant was removed from.
    fn clear_many(
        &self,
        keys: &[CounterKey],
        participant: &str,
    ) -> impl Future<Output = Result<usize>> + Send {
        async move {
            let mut removed = 0;
            for key in keys {
                if self.clear(key, participant).await? {
                    removed += 1;
                }
            }
            Ok(removed)
        }
    }
}

/// Run `op` until it stops failing with `Error::ConcurrencyConflict`, at most
/// `max_attempts` times (minimum one).
///
/// The final conflict is returned with the number of attempts made; every
/// other error is returned immediately.
///
/// # Errors
///
/// Returns the error produced by the last attempt.
pub async fn retry_on_conflict<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Err(Error::ConcurrencyConflict { key, .. }) if attempt < max_attempts => {
                tracing::debug!(%key, attempt, "retrying after concurrency conflict");
                attempt += 1;
            }
            Err(Error::ConcurrencyConflict { key, .. }) => {
                tracing::warn!(%key, attempts = attempt, "giving up after concurrency conflicts");
                return Err(Error::ConcurrencyConflict {
                    key,
                    attempts: attempt,
                });
            }
            other => return other,
        }
    }
}
