//! Injected collaborators: randomness, feature flags and time

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed floats.
pub trait RandomSource: Send + Sync {
    /// Draw from `[low, high)`. Returns `low` when the range is empty.
    fn uniform(&self, low: f64, high: f64) -> f64;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high > low {
            rand::thread_rng().gen_range(low..high)
        } else {
            low
        }
    }
}

/// Deterministic generator for tests and replayable simulations.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a generator from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high > low {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range(low..high)
        } else {
            low
        }
    }
}

/// Boolean feature-flag lookup used by `Track` state gating.
pub trait FeatureFlags: Send + Sync {
    /// Whether the named flag is on.
    fn is_active(&self, flag: &str) -> bool;
}

/// Flags that are never active.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllFlagsOff;

impl FeatureFlags for AllFlagsOff {
    fn is_active(&self, _flag: &str) -> bool {
        false
    }
}

/// Runtime-mutable set of active flags.
#[derive(Debug, Default)]
pub struct StaticFlags {
    active: DashSet<String>,
}

impl StaticFlags {
    /// Create with no active flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a flag on.
    pub fn activate(&self, flag: impl Into<String>) {
        self.active.insert(flag.into());
    }

    /// Turn a flag off.
    pub fn deactivate(&self, flag: &str) {
        self.active.remove(flag);
    }
}

impl FeatureFlags for StaticFlags {
    fn is_active(&self, flag: &str) -> bool {
        self.active.contains(flag)
    }
}

/// Wall-clock source.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
