//! Bucketing engine
//!
//! Resolves which alternative a participant sees. Assignment is a
//! read-or-create against [`ExperimentStore::enroll_if_absent`]: the first
//! successful enrollment wins and every later call, sequential or
//! concurrent, returns the same alternative.
//!
//! | State   | Existing enrollment | New participant                   |
//! |---------|---------------------|-----------------------------------|
//! | Control | returned            | `InvalidState` (sees the default) |
//! | Enabled | returned            | enrolled                          |
//! | Track   | returned            | enrolled only if the switch is on |

mod source;
mod weighted;

pub use source::{
    AllFlagsOff, Clock, FeatureFlags, FixedClock, RandomSource, SeededRandom, StaticFlags,
    SystemClock, ThreadRandom,
};
pub use weighted::{choose_alternative, weighted_choice};

use std::sync::Arc;

use crate::experiment::{Enrollment, Experiment, ExperimentStore};
use crate::{Error, Result};

/// Outcome of resolving a participant's alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Alternative the participant is bucketed into.
    pub alternative: String,
    /// `true` only for the call that created the enrollment.
    pub newly_enrolled: bool,
}

/// Assigns participants to alternatives.
#[derive(Clone)]
pub struct Bucketing {
    random: Arc<dyn RandomSource>,
    flags: Arc<dyn FeatureFlags>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Bucketing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucketing").finish_non_exhaustive()
    }
}

impl Default for Bucketing {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom), Arc::new(AllFlagsOff), Arc::new(SystemClock))
    }
}

impl Bucketing {
    /// Create an engine from its collaborators.
    #[must_use]
    pub fn new(
        random: Arc<dyn RandomSource>,
        flags: Arc<dyn FeatureFlags>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            random,
            flags,
            clock,
        }
    }

    /// Feature flags consulted for `Track` state.
    #[must_use]
    pub fn flags(&self) -> &dyn FeatureFlags {
        self.flags.as_ref()
    }

    /// Clock used to stamp enrollments.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Return the participant's alternative, enrolling them if needed.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidState` if the participant is new and the experiment
    ///   is not accepting new users
    /// - `Error::NoAlternativesAvailable` / `Error::DegenerateWeights` from
    ///   [`choose_alternative`]
    /// - any store error
    pub async fn assign<S: ExperimentStore>(
        &self,
        store: &S,
        experiment: &Experiment,
        participant: &str,
    ) -> Result<Assignment> {
        if let Some(existing) = store.get_enrollment(experiment.name(), participant).await? {
            return Ok(Assignment {
                alternative: existing.alternative().to_string(),
                newly_enrolled: false,
            });
        }

        if !experiment.is_accepting_new_users(self.flags.as_ref()) {
            return Err(Error::InvalidState {
                experiment: experiment.name().to_string(),
                state: experiment.state().to_string(),
                operation: "enroll new participants",
            });
        }

        let chosen = choose_alternative(experiment, self.random.as_ref())?;
        let candidate = Enrollment::new(participant, experiment.name(), chosen, self.clock.now());
        let outcome = store.enroll_if_absent(candidate).await?;
        let newly_enrolled = outcome.is_created();
        let stored = outcome.into_enrollment();

        if newly_enrolled {
            tracing::info!(
                experiment = experiment.name(),
                participant,
                alternative = stored.alternative(),
                "enrolled participant"
            );
        } else {
            tracing::debug!(
                experiment = experiment.name(),
                participant,
                alternative = stored.alternative(),
                "lost enrollment race, using existing alternative"
            );
        }

        Ok(Assignment {
            alternative: stored.alternative().to_string(),
            newly_enrolled,
        })
    }
}
