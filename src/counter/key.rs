//! Counter keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a counter measures for one (experiment, alternative) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// One entry per enrolled participant.
    Participation,
    /// Number of times each participant performed a goal action.
    Goal(String),
}

/// Composite key `(experiment, alternative, goal-or-participation)`.
///
/// Displays as `experiment:alternative:participant` or
/// `experiment:alternative:goal:goal`, the flat form used by key-value
/// backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterKey {
    experiment: String,
    alternative: String,
    metric: Metric,
}

impl CounterKey {
    /// Key counting participants of an alternative.
    #[must_use]
    pub fn participation(experiment: impl Into<String>, alternative: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            alternative: alternative.into(),
            metric: Metric::Participation,
        }
    }

    /// Key counting goal actions of an alternative.
    #[must_use]
    pub fn goal(
        experiment: impl Into<String>,
        alternative: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            alternative: alternative.into(),
            metric: Metric::Goal(goal.into()),
        }
    }

    /// Experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Alternative name.
    #[must_use]
    pub fn alternative(&self) -> &str {
        &self.alternative
    }

    /// Measured metric.
    #[must_use]
    pub const fn metric(&self) -> &Metric {
        &self.metric
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.metric {
            Metric::Participation => {
                write!(f, "{}:{}:participant", self.experiment, self.alternative)
            }
            Metric::Goal(goal) => {
                write!(f, "{}:{}:{goal}:goal", self.experiment, self.alternative)
            }
        }
    }
}
