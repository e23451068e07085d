//! Experiment Record - root entity for split testing

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Alternative;
use crate::bucketing::FeatureFlags;
use crate::{Error, Result};

/// Lifecycle state of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentState {
    /// Everyone sees the default alternative; nobody new is enrolled.
    #[default]
    Control,
    /// Alternatives are shown and new participants are always enrolled.
    Enabled,
    /// Alternatives are shown; new enrollment is gated by the switch flag.
    Track,
}

impl fmt::Display for ExperimentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "control",
            Self::Enabled => "enabled",
            Self::Track => "track",
        };
        f.write_str(name)
    }
}

/// Experiment Record represents a split test.
///
/// Alternatives keep their insertion order, which is also the iteration order
/// used by weighted assignment.
///
/// ## Invariants (checked by [`Experiment::validate`])
///
/// - alternative names are unique
/// - at most one alternative is marked default
/// - either every alternative carries a weight or none does
/// - weights are finite and non-negative
/// - `Track` state requires a `switch_key`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    name: String,
    description: String,
    alternatives: Vec<Alternative>,
    relevant_chi2_goals: Vec<String>,
    relevant_mwu_goals: Vec<String>,
    switch_key: Option<String>,
    state: ExperimentState,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl Experiment {
    /// Create a new experiment in `Control` state with no alternatives.
    ///
    /// The start date is unset until the experiment is saved through the
    /// engine, which stamps it from its clock.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            alternatives: Vec::new(),
            relevant_chi2_goals: Vec::new(),
            relevant_mwu_goals: Vec::new(),
            switch_key: None,
            state: ExperimentState::Control,
            start_date: None,
            end_date: None,
        }
    }

    /// Create a builder for an experiment with alternatives and optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(name)
    }

    /// Experiment name (unique key).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ExperimentState {
        self.state
    }

    /// Feature flag gating enrollment in `Track` state.
    #[must_use]
    pub fn switch_key(&self) -> Option<&str> {
        self.switch_key.as_deref()
    }

    /// Start timestamp.
    #[must_use]
    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Set the start timestamp if none was given.
    pub(crate) fn start_if_unset(&mut self, now: DateTime<Utc>) {
        self.start_date.get_or_insert(now);
    }

    /// End timestamp, set when the experiment returns to `Control`.
    #[must_use]
    pub const fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    /// All alternatives in insertion order.
    #[must_use]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Enabled alternatives in insertion order.
    pub fn enabled_alternatives(&self) -> impl Iterator<Item = &Alternative> {
        self.alternatives.iter().filter(|alt| alt.is_enabled())
    }

    /// Look up an alternative by name.
    #[must_use]
    pub fn alternative(&self, name: &str) -> Option<&Alternative> {
        self.alternatives.iter().find(|alt| alt.name() == name)
    }

    /// Goals analysed with the chi-squared test.
    #[must_use]
    pub fn relevant_chi2_goals(&self) -> &[String] {
        &self.relevant_chi2_goals
    }

    /// Goals analysed with the Mann-Whitney U test.
    #[must_use]
    pub fn relevant_mwu_goals(&self) -> &[String] {
        &self.relevant_mwu_goals
    }

    /// Name of the default alternative, falling back to `control_group`.
    #[must_use]
    pub fn default_alternative<'a>(&'a self, control_group: &'a str) -> &'a str {
        self.alternatives
            .iter()
            .find(|alt| alt.is_default())
            .map_or(control_group, Alternative::name)
    }

    /// Whether participants currently see their assigned alternative.
    #[must_use]
    pub const fn is_displaying_alternatives(&self) -> bool {
        match self.state {
            ExperimentState::Control => false,
            ExperimentState::Enabled | ExperimentState::Track => true,
        }
    }

    /// Whether new participants may be enrolled right now.
    #[must_use]
    pub fn is_accepting_new_users(&self, flags: &dyn FeatureFlags) -> bool {
        match self.state {
            ExperimentState::Control => false,
            ExperimentState::Enabled => true,
            ExperimentState::Track => self
                .switch_key
                .as_deref()
                .is_some_and(|flag| flags.is_active(flag)),
        }
    }

    /// Whether every alternative carries an explicit weight.
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        !self.alternatives.is_empty() && self.alternatives.iter().all(|a| a.weight().is_some())
    }

    /// Check every configuration invariant.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "experiment name must not be empty".to_string(),
            ));
        }
        if self.alternatives.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "experiment '{}' has no alternatives",
                self.name
            )));
        }
        validate_alternatives(&self.name, &self.alternatives)?;
        if self.state == ExperimentState::Track && self.switch_key.is_none() {
            return Err(Error::InvalidConfiguration(format!(
                "experiment '{}' is in track state but has no switch_key",
                self.name
            )));
        }
        Ok(())
    }

    /// Add `name` as an enabled alternative if it does not exist yet, and set
    /// its weight if one is given and none was set before.
    ///
    /// Returns `true` if the experiment changed.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if the change would mix weighted
    /// and unweighted alternatives or use an invalid weight. The experiment
    /// is left untouched in that case.
    pub fn ensure_alternative_exists(&mut self, name: &str, weight: Option<f64>) -> Result<bool> {
        let mut alternatives = self.alternatives.clone();
        let mut changed = false;

        let index = if let Some(index) = alternatives.iter().position(|a| a.name() == name) {
            index
        } else {
            alternatives.push(Alternative::new(name));
            changed = true;
            alternatives.len() - 1
        };

        if let Some(weight) = weight {
            if alternatives[index].weight().is_none() {
                alternatives[index].set_weight(weight);
                changed = true;
            }
        }

        if changed {
            validate_alternatives(&self.name, &alternatives)?;
            self.alternatives = alternatives;
        }
        Ok(changed)
    }

    /// Make `name` the only default alternative.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the alternative does not exist.
    pub fn set_default_alternative(&mut self, name: &str) -> Result<()> {
        self.require_alternative(name)?;
        for alt in &mut self.alternatives {
            alt.set_default(alt.name() == name);
        }
        Ok(())
    }

    /// Enable or disable an alternative for new enrollments.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the alternative does not exist.
    pub fn set_alternative_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.require_alternative(name)?;
        if let Some(alt) = self.alternatives.iter_mut().find(|a| a.name() == name) {
            alt.set_enabled(enabled);
        }
        Ok(())
    }

    /// Change state. Entering `Control` stamps `end_date`; any other state clears it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` when entering `Track` without a `switch_key`.
    pub fn set_state(&mut self, state: ExperimentState, now: DateTime<Utc>) -> Result<()> {
        if state == ExperimentState::Track && self.switch_key.is_none() {
            return Err(Error::InvalidState {
                experiment: self.name.clone(),
                state: self.state.to_string(),
                operation: "enter track state without a switch_key",
            });
        }
        self.state = state;
        self.end_date = match state {
            ExperimentState::Control => Some(now),
            ExperimentState::Enabled | ExperimentState::Track => None,
        };
        Ok(())
    }

    /// Serializable summary for listings and report headers.
    #[must_use]
    pub fn to_summary(&self, control_group: &str) -> ExperimentSummary {
        ExperimentSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            state: self.state,
            start_date: self.start_date,
            end_date: self.end_date,
            relevant_chi2_goals: self.relevant_chi2_goals.clone(),
            relevant_mwu_goals: self.relevant_mwu_goals.clone(),
            default_alternative: self.default_alternative(control_group).to_string(),
            alternatives: self
                .alternatives
                .iter()
                .map(Alternative::name)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    fn require_alternative(&self, name: &str) -> Result<()> {
        if self.alternative(name).is_none() {
            return Err(Error::NotFound {
                kind: "alternative",
                name: format!("{}/{name}", self.name),
            });
        }
        Ok(())
    }
}

fn validate_alternatives(experiment: &str, alternatives: &[Alternative]) -> Result<()> {
    let mut seen = HashSet::with_capacity(alternatives.len());
    for alt in alternatives {
        if !seen.insert(alt.name()) {
            return Err(Error::InvalidConfiguration(format!(
                "experiment '{experiment}' has duplicate alternative '{}'",
                alt.name()
            )));
        }
        if let Some(weight) = alt.weight() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "alternative '{}' of '{experiment}' has invalid weight {weight}",
                    alt.name()
                )));
            }
        }
    }

    let weighted = alternatives.iter().filter(|a| a.weight().is_some()).count();
    if weighted != 0 && weighted != alternatives.len() {
        return Err(Error::InvalidConfiguration(format!(
            "experiment '{experiment}' mixes weighted and unweighted alternatives \
             ({weighted} of {} weighted)",
            alternatives.len()
        )));
    }

    if alternatives.iter().filter(|a| a.is_default()).count() > 1 {
        return Err(Error::InvalidConfiguration(format!(
            "experiment '{experiment}' has more than one default alternative"
        )));
    }
    Ok(())
}

/// Flat, serializable view of an experiment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExperimentSummary {
    /// Experiment name
    pub name: String,
    /// Description
    pub description: String,
    /// Current state
    pub state: ExperimentState,
    /// Start timestamp
    pub start_date: Option<DateTime<Utc>>,
    /// End timestamp
    pub end_date: Option<DateTime<Utc>>,
    /// Chi-squared goals
    pub relevant_chi2_goals: Vec<String>,
    /// Mann-Whitney goals
    pub relevant_mwu_goals: Vec<String>,
    /// Default alternative name
    pub default_alternative: String,
    /// Comma-joined alternative names
    pub alternatives: String,
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    experiment: Experiment,
}

impl ExperimentBuilder {
    /// Create a new builder with the required name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment: Experiment::new(name),
        }
    }

    /// Append an alternative.
    #[must_use]
    pub fn alternative(mut self, alternative: Alternative) -> Self {
        self.experiment.alternatives.push(alternative);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.experiment.description = description.into();
        self
    }

    /// Set the initial state.
    #[must_use]
    pub const fn state(mut self, state: ExperimentState) -> Self {
        self.experiment.state = state;
        self
    }

    /// Set the feature flag consulted in `Track` state.
    #[must_use]
    pub fn switch_key(mut self, flag: impl Into<String>) -> Self {
        self.experiment.switch_key = Some(flag.into());
        self
    }

    /// Add a goal analysed with the chi-squared test.
    #[must_use]
    pub fn chi2_goal(mut self, goal: impl Into<String>) -> Self {
        self.experiment.relevant_chi2_goals.push(goal.into());
        self
    }

    /// Add a goal analysed with the Mann-Whitney U test.
    #[must_use]
    pub fn mwu_goal(mut self, goal: impl Into<String>) -> Self {
        self.experiment.relevant_mwu_goals.push(goal.into());
        self
    }

    /// Set a custom start timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.experiment.start_date = Some(start_date);
        self
    }

    /// Build and validate the `Experiment`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfiguration` if any invariant is violated.
    pub fn build(self) -> Result<Experiment> {
        self.experiment.validate()?;
        Ok(self.experiment)
    }
}
