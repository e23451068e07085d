//! Enrollment Record - durable bucket assignment of one participant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enrollment Record binds a participant to one alternative of an experiment.
///
/// Created at most once per (experiment, participant) pair; the alternative
/// never changes implicitly afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    participant: String,
    experiment: String,
    alternative: String,
    enrollment_date: DateTime<Utc>,
    last_seen: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// Create a new enrollment stamped with `enrollment_date`.
    #[must_use]
    pub fn new(
        participant: impl Into<String>,
        experiment: impl Into<String>,
        alternative: impl Into<String>,
        enrollment_date: DateTime<Utc>,
    ) -> Self {
        Self {
            participant: participant.into(),
            experiment: experiment.into(),
            alternative: alternative.into(),
            enrollment_date,
            last_seen: None,
        }
    }

    /// Participant identifier.
    #[must_use]
    pub fn participant(&self) -> &str {
        &self.participant
    }

    /// Experiment name.
    #[must_use]
    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Assigned alternative.
    #[must_use]
    pub fn alternative(&self) -> &str {
        &self.alternative
    }

    /// When the participant was enrolled.
    #[must_use]
    pub const fn enrollment_date(&self) -> DateTime<Utc> {
        self.enrollment_date
    }

    /// When the participant was last seen in this experiment.
    #[must_use]
    pub const fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = Some(now);
    }
}
