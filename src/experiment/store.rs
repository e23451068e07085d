//! Experiment Store - persistence seam for experiments and enrollments
//!
//! Durable storage is an external collaborator. The trait mirrors the async
//! shape of the counter store so a database-backed implementation can drop in.

use std::future::Future;

use chrono::{DateTime, Utc};

use super::{Enrollment, Experiment, ExperimentState};
use crate::{Error, Result};

/// Result of [`ExperimentStore::enroll_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrolled {
    /// The candidate was stored.
    Created(Enrollment),
    /// Another enrollment already existed and was left untouched.
    Existing(Enrollment),
}

impl Enrolled {
    /// The enrollment now stored.
    #[must_use]
    pub const fn enrollment(&self) -> &Enrollment {
        match self {
            Self::Created(e) | Self::Existing(e) => e,
        }
    }

    /// Whether this call created the enrollment.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Unwrap into the stored enrollment.
    #[must_use]
    pub fn into_enrollment(self) -> Enrollment {
        match self {
            Self::Created(e) | Self::Existing(e) => e,
        }
    }
}

/// Persistence for experiments and enrollments.
pub trait ExperimentStore: Send + Sync {
    /// Get an experiment by name. Returns `None` if it doesn't exist.
    fn get_experiment(&self, name: &str)
        -> impl Future<Output = Result<Option<Experiment>>> + Send;

    /// Insert or replace an experiment.
    ///
    /// Implementations must reject experiments that fail [`Experiment::validate`].
    fn save_experiment(&self, experiment: Experiment) -> impl Future<Output = Result<()>> + Send;

    /// Delete an experiment together with its enrollments. No-op if absent.
    fn delete_experiment(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// All experiments, ordered by start date then name.
    fn list_experiments(&self) -> impl Future<Output = Result<Vec<Experiment>>> + Send;

    /// Get the enrollment for a participant, if any.
    fn get_enrollment(
        &self,
        experiment: &str,
        participant: &str,
    ) -> impl Future<Output = Result<Option<Enrollment>>> + Send;

    /// Store `enrollment` unless one already exists for the same
    /// (experiment, participant) pair, as one atomic step. Concurrent callers
    /// all observe the single winning record.
    fn enroll_if_absent(
        &self,
        enrollment: Enrollment,
    ) -> impl Future<Output = Result<Enrolled>> + Send;

    /// Replace an enrollment unconditionally (explicit admin override).
    fn set_enrollment(&self, enrollment: Enrollment) -> impl Future<Output = Result<()>> + Send;

    /// Update `last_seen` on an existing enrollment.
    ///
    /// Returns `Error::NotFound` if the participant is not enrolled.
    fn touch_enrollment(
        &self,
        experiment: &str,
        participant: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove an enrollment, returning it if it existed.
    fn remove_enrollment(
        &self,
        experiment: &str,
        participant: &str,
    ) -> impl Future<Output = Result<Option<Enrollment>>> + Send;

    /// Number of enrollments for an experiment.
    fn enrollment_count(&self, experiment: &str) -> impl Future<Output = Result<usize>> + Send;

    /// Get an experiment, failing if it doesn't exist.
    fn require_experiment(&self, name: &str) -> impl Future<Output = Result<Experiment>> + Send {
        async move {
            self.get_experiment(name)
                .await?
                .ok_or_else(|| Error::experiment_not_found(name))
        }
    }

    /// Experiments currently showing alternatives (`Enabled` or `Track`).
    fn enabled_experiments(&self) -> impl Future<Output = Result<Vec<Experiment>>> + Send {
        async move {
            let experiments = self.list_experiments().await?;
            Ok(experiments
                .into_iter()
                .filter(|e| e.state() != ExperimentState::Control)
                .collect())
        }
    }
}
