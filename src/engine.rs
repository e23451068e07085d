//! Experiment engine facade
//!
//! Ties the bucketing engine, the counter store and the report compiler
//! together behind the operations an application calls.

use std::sync::Arc;

use crate::bucketing::{
    AllFlagsOff, Assignment, Bucketing, Clock, FeatureFlags, RandomSource, SystemClock,
    ThreadRandom,
};
use crate::config::{Config, GoalCatalog};
use crate::counter::{retry_on_conflict, CounterKey, CounterStore, Histogram};
use crate::experiment::{Enrollment, Experiment, ExperimentState, ExperimentStore};
use crate::report::{Report, ReportCompiler};
use crate::{Error, Result};

/// Experiment engine.
///
/// Generic over its counter and experiment stores; the in-memory
/// implementations cover tests and single-process deployments.
///
/// # Example
///
/// ```rust,no_run
/// use trueno_experiments::counter::MemoryCounterStore;
/// use trueno_experiments::experiment::{Alternative, Experiment, ExperimentState, MemoryExperimentStore};
/// use trueno_experiments::config::{Config, GoalCatalog};
/// use trueno_experiments::ExperimentEngine;
///
/// # async fn example() -> trueno_experiments::Result<()> {
/// let engine = ExperimentEngine::builder(MemoryCounterStore::new(), MemoryExperimentStore::new())
///     .config(Config::default().goals(GoalCatalog::new(["signup"])))
///     .build()?;
///
/// engine
///     .save_experiment(
///         Experiment::builder("landing_page")
///             .alternative(Alternative::new("control"))
///             .alternative(Alternative::new("hero_video"))
///             .state(ExperimentState::Enabled)
///             .build()?,
///     )
///     .await?;
///
/// let alternative = engine.assign("landing_page", "user-42").await?;
/// engine.record_goal("landing_page", &alternative, "signup", "user-42", 1).await?;
///
/// let report = engine.compute_report("landing_page").await?;
/// println!("{}", report.to_json()?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExperimentEngine<C, S> {
    counters: C,
    store: S,
    config: Config,
    bucketing: Bucketing,
}

impl<C: CounterStore, S: ExperimentStore> ExperimentEngine<C, S> {
    /// Start building an engine over the given stores.
    #[must_use]
    pub fn builder(counters: C, store: S) -> ExperimentEngineBuilder<C, S> {
        ExperimentEngineBuilder::new(counters, store)
    }

    /// Counter store.
    #[must_use]
    pub const fn counters(&self) -> &C {
        &self.counters
    }

    /// Experiment store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Bucketing engine and its collaborators.
    #[must_use]
    pub const fn bucketing(&self) -> &Bucketing {
        &self.bucketing
    }

    /// Validate and store an experiment, replacing any with the same name.
    ///
    /// An experiment without a start date is stamped with the engine clock.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the experiment is invalid.
    pub async fn save_experiment(&self, mut experiment: Experiment) -> Result<()> {
        experiment.start_if_unset(self.bucketing.clock().now());
        self.store.save_experiment(experiment).await
    }

    /// Load an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if there is no such experiment.
    pub async fn experiment(&self, name: &str) -> Result<Experiment> {
        self.store.require_experiment(name).await
    }

    /// Move an experiment to another lifecycle state.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if there is no such experiment
    /// - `Error::InvalidState` when entering `Track` without a switch key
    pub async fn set_state(&self, name: &str, state: ExperimentState) -> Result<()> {
        let mut experiment = self.store.require_experiment(name).await?;
        let previous = experiment.state();
        experiment.set_state(state, self.bucketing.clock().now())?;
        self.store.save_experiment(experiment).await?;
        tracing::info!(experiment = name, %previous, %state, "experiment state changed");
        Ok(())
    }

    /// Add an enabled alternative if the experiment does not have it yet.
    ///
    /// Returns `true` if the experiment was modified.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if there is no such experiment
    /// - `Error::InvalidConfiguration` if the change would break an invariant
    pub async fn ensure_alternative(
        &self,
        name: &str,
        alternative: &str,
        weight: Option<f64>,
    ) -> Result<bool> {
        let mut experiment = self.store.require_experiment(name).await?;
        let changed = experiment.ensure_alternative_exists(alternative, weight)?;
        if changed {
            self.store.save_experiment(experiment).await?;
        }
        Ok(changed)
    }

    /// Delete an experiment and its enrollments. Counters are left in place.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn delete_experiment(&self, name: &str) -> Result<()> {
        self.store.delete_experiment(name).await
    }

    /// Return the participant's alternative, enrolling them if needed.
    ///
    /// A new enrollment is counted as participation exactly once, by the
    /// caller that created it. If that count cannot be recorded the
    /// enrollment is withdrawn again, so a later call starts over.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if there is no such experiment
    /// - `Error::InvalidState` if the participant is new and the experiment
    ///   is not accepting new users
    /// - `Error::NoAlternativesAvailable` / `Error::DegenerateWeights`
    /// - `Error::ConcurrencyConflict` if participation could not be counted
    pub async fn enroll(&self, name: &str, participant: &str) -> Result<Assignment> {
        let experiment = self.store.require_experiment(name).await?;
        let assignment = self.bucketing.assign(&self.store, &experiment, participant).await?;
        if assignment.newly_enrolled {
            if let Err(err) = self
                .record_participation(name, &assignment.alternative, participant)
                .await
            {
                if let Err(rollback) = self.store.remove_enrollment(name, participant).await {
                    tracing::warn!(
                        experiment = name,
                        participant,
                        error = %rollback,
                        "failed to withdraw uncounted enrollment"
                    );
                }
                return Err(err);
            }
        }
        Ok(assignment)
    }

    /// Return the participant's alternative name, enrolling them if needed.
    ///
    /// # Errors
    ///
    /// See [`ExperimentEngine::enroll`].
    pub async fn assign(&self, name: &str, participant: &str) -> Result<String> {
        self.enroll(name, participant)
            .await
            .map(|assignment| assignment.alternative)
    }

    /// Alternative to show a participant.
    ///
    /// Like [`ExperimentEngine::assign`], except that experiments not
    /// displaying alternatives, or not accepting a new participant, yield
    /// the default alternative instead of an error. Nothing is stored in
    /// that case.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` for unknown experiments, plus weight and store errors.
    pub async fn alternative_for(&self, name: &str, participant: &str) -> Result<String> {
        let experiment = self.store.require_experiment(name).await?;
        let default = || {
            experiment
                .default_alternative(self.config.control_group_name())
                .to_string()
        };
        if !experiment.is_displaying_alternatives() {
            return Ok(default());
        }
        match self.enroll(name, participant).await {
            Ok(assignment) => Ok(assignment.alternative),
            Err(Error::InvalidState { .. }) => Ok(default()),
            Err(err) => Err(err),
        }
    }

    /// Put a participant in a specific alternative, replacing any existing
    /// enrollment.
    ///
    /// When the participant moves, their participation and goal counts
    /// under the old alternative are cleared and participation is recorded
    /// under the new one. The enrollment is written last: a failed call
    /// leaves it unchanged, and repeating the call completes the move.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the experiment or alternative does not exist
    /// - `Error::ConcurrencyConflict` if the counters stay contended
    pub async fn set_alternative(
        &self,
        name: &str,
        participant: &str,
        alternative: &str,
    ) -> Result<()> {
        let experiment = self.store.require_experiment(name).await?;
        if experiment.alternative(alternative).is_none() {
            return Err(Error::NotFound {
                kind: "alternative",
                name: format!("{name}/{alternative}"),
            });
        }

        let previous = self.store.get_enrollment(name, participant).await?;
        if previous.as_ref().is_some_and(|e| e.alternative() == alternative) {
            return Ok(());
        }
        if let Some(previous) = &previous {
            self.remove_participant(name, previous.alternative(), participant)
                .await?;
        }
        // A repeated call must not count the participant twice
        let key = CounterKey::participation(name, alternative);
        if self.counters.get_frequency(&key, participant).await? == 0 {
            self.increment(&key, participant, 1).await?;
        }
        self.store
            .set_enrollment(Enrollment::new(
                participant,
                name,
                alternative,
                self.bucketing.clock().now(),
            ))
            .await?;
        tracing::info!(experiment = name, participant, alternative, "alternative overridden");
        Ok(())
    }

    /// Update the participant's `last_seen` timestamp.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if the participant is not enrolled.
    pub async fn mark_seen(&self, name: &str, participant: &str) -> Result<()> {
        self.store
            .touch_enrollment(name, participant, self.bucketing.clock().now())
            .await
    }

    /// Count `amount` goal actions for a participant. Returns their new count.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if the goal is not in the configured catalog
    /// - `Error::ConcurrencyConflict` if the store stays contended
    pub async fn record_goal(
        &self,
        name: &str,
        alternative: &str,
        goal: &str,
        participant: &str,
        amount: u64,
    ) -> Result<u64> {
        if !self.config.goal_catalog().contains(goal) {
            return Err(Error::NotFound {
                kind: "goal",
                name: goal.to_string(),
            });
        }
        let key = CounterKey::goal(name, alternative, goal);
        self.increment(&key, participant, amount).await
    }

    /// Count a participant under an alternative.
    ///
    /// # Errors
    ///
    /// `Error::ConcurrencyConflict` if the store stays contended.
    pub async fn record_participation(
        &self,
        name: &str,
        alternative: &str,
        participant: &str,
    ) -> Result<u64> {
        let key = CounterKey::participation(name, alternative);
        self.increment(&key, participant, 1).await
    }

    /// Remove a participant's participation and every catalog goal count
    /// under an alternative. Returns the number of counters touched.
    ///
    /// # Errors
    ///
    /// `Error::ConcurrencyConflict` if the store stays contended.
    pub async fn remove_participant(
        &self,
        name: &str,
        alternative: &str,
        participant: &str,
    ) -> Result<usize> {
        let keys: Vec<CounterKey> = std::iter::once(CounterKey::participation(name, alternative))
            .chain(
                self.config
                    .goal_catalog()
                    .iter()
                    .map(|goal| CounterKey::goal(name, alternative, goal)),
            )
            .collect();
        let keys = keys.as_slice();
        let removed = retry_on_conflict(self.config.conflict_retries(), move || {
            self.counters.clear_many(keys, participant)
        })
        .await?;
        tracing::debug!(experiment = name, alternative, participant, removed, "participant removed");
        Ok(removed)
    }

    /// Participants counted under an alternative.
    ///
    /// # Errors
    ///
    /// Propagates counter store errors.
    pub async fn participant_count(&self, name: &str, alternative: &str) -> Result<u64> {
        self.counters
            .get(&CounterKey::participation(name, alternative))
            .await
    }

    /// Participants who reached a goal at least once.
    ///
    /// # Errors
    ///
    /// Propagates counter store errors.
    pub async fn goal_count(&self, name: &str, alternative: &str, goal: &str) -> Result<u64> {
        self.counters
            .get(&CounterKey::goal(name, alternative, goal))
            .await
    }

    /// Goal action histogram, without the implicit zero bucket.
    ///
    /// # Errors
    ///
    /// Propagates counter store errors.
    pub async fn goal_distribution(
        &self,
        name: &str,
        alternative: &str,
        goal: &str,
    ) -> Result<Histogram> {
        self.counters
            .get_frequencies(&CounterKey::goal(name, alternative, goal))
            .await
    }

    /// A participant's count for every catalog goal, in catalog order.
    ///
    /// # Errors
    ///
    /// Propagates counter store errors.
    pub async fn participant_goal_frequencies(
        &self,
        name: &str,
        alternative: &str,
        participant: &str,
    ) -> Result<Vec<(String, u64)>> {
        let mut frequencies = Vec::with_capacity(self.config.goal_catalog().len());
        for goal in self.config.goal_catalog().iter() {
            let count = self
                .counters
                .get_frequency(&CounterKey::goal(name, alternative, goal), participant)
                .await?;
            frequencies.push((goal.to_string(), count));
        }
        Ok(frequencies)
    }

    /// Compile the report over the configured goal catalog.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if there is no such experiment, plus store errors.
    pub async fn compute_report(&self, name: &str) -> Result<Report> {
        self.compute_report_with_goals(name, self.config.goal_catalog())
            .await
    }

    /// Compile the report over an explicit goal catalog.
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if there is no such experiment, plus store errors.
    pub async fn compute_report_with_goals(&self, name: &str, goals: &GoalCatalog) -> Result<Report> {
        let experiment = self.store.require_experiment(name).await?;
        ReportCompiler::new(&self.counters, &self.config)
            .compile(&experiment, goals)
            .await
    }

    async fn increment(&self, key: &CounterKey, participant: &str, amount: u64) -> Result<u64> {
        retry_on_conflict(self.config.conflict_retries(), move || {
            self.counters.increment(key, participant, amount)
        })
        .await
    }
}

/// Builder for [`ExperimentEngine`].
pub struct ExperimentEngineBuilder<C, S> {
    counters: C,
    store: S,
    config: Config,
    random: Arc<dyn RandomSource>,
    flags: Arc<dyn FeatureFlags>,
    clock: Arc<dyn Clock>,
}

impl<C, S> ExperimentEngineBuilder<C, S> {
    fn new(counters: C, store: S) -> Self {
        Self {
            counters,
            store,
            config: Config::default(),
            random: Arc::new(ThreadRandom),
            flags: Arc::new(AllFlagsOff),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the random source used for new assignments.
    #[must_use]
    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Set the feature flags consulted in `Track` state.
    #[must_use]
    pub fn flags(mut self, flags: Arc<dyn FeatureFlags>) -> Self {
        self.flags = flags;
        self
    }

    /// Set the clock used for timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the control group name is empty.
    pub fn build(self) -> Result<ExperimentEngine<C, S>> {
        if self.config.control_group_name().trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "control group name must not be empty".to_string(),
            ));
        }
        Ok(ExperimentEngine {
            counters: self.counters,
            store: self.store,
            config: self.config,
            bucketing: Bucketing::new(self.random, self.flags, self.clock),
        })
    }
}
