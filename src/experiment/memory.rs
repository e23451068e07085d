//! In-memory experiment store using `DashMap`.
//!
//! Data is lost on process restart; production deployments back
//! [`ExperimentStore`] with their own database.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Enrolled, Enrollment, Experiment, ExperimentStore};
use crate::{Error, Result};

type EnrollmentKey = (String, String);

fn enrollment_key(experiment: &str, participant: &str) -> EnrollmentKey {
    (experiment.to_string(), participant.to_string())
}

/// In-memory experiment and enrollment store.
///
/// `enroll_if_absent` runs under the shard lock of the enrollment key, so
/// concurrent first-time assignments converge on a single record.
#[derive(Debug, Default)]
pub struct MemoryExperimentStore {
    experiments: DashMap<String, Experiment>,
    enrollments: DashMap<EnrollmentKey, Enrollment>,
}

impl MemoryExperimentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    /// Total number of enrollments across all experiments.
    #[must_use]
    pub fn total_enrollments(&self) -> usize {
        self.enrollments.len()
    }

    /// Check if the store holds no experiments and no enrollments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty() && self.enrollments.is_empty()
    }
}

impl ExperimentStore for MemoryExperimentStore {
    async fn get_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self.experiments.get(name).map(|e| e.value().clone()))
    }

    async fn save_experiment(&self, experiment: Experiment) -> Result<()> {
        experiment.validate().inspect_err(|err| {
            tracing::warn!(experiment = experiment.name(), %err, "rejected experiment");
        })?;
        self.experiments
            .insert(experiment.name().to_string(), experiment);
        Ok(())
    }

    async fn delete_experiment(&self, name: &str) -> Result<()> {
        if self.experiments.remove(name).is_some() {
            self.enrollments.retain(|(experiment, _), _| experiment != name);
            tracing::info!(experiment = name, "deleted experiment and its enrollments");
        }
        Ok(())
    }

    async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        let mut experiments: Vec<Experiment> =
            self.experiments.iter().map(|e| e.value().clone()).collect();
        experiments.sort_by(|a, b| {
            a.start_date()
                .cmp(&b.start_date())
                .then_with(|| a.name().cmp(b.name()))
        });
        Ok(experiments)
    }

    async fn get_enrollment(&self, experiment: &str, participant: &str) -> Result<Option<Enrollment>> {
        Ok(self
            .enrollments
            .get(&enrollment_key(experiment, participant))
            .map(|e| e.value().clone()))
    }

    async fn enroll_if_absent(&self, enrollment: Enrollment) -> Result<Enrolled> {
        let key = enrollment_key(enrollment.experiment(), enrollment.participant());
        match self.enrollments.entry(key) {
            Entry::Occupied(existing) => Ok(Enrolled::Existing(existing.get().clone())),
            Entry::Vacant(slot) => Ok(Enrolled::Created(slot.insert(enrollment).value().clone())),
        }
    }

    async fn set_enrollment(&self, enrollment: Enrollment) -> Result<()> {
        let key = enrollment_key(enrollment.experiment(), enrollment.participant());
        self.enrollments.insert(key, enrollment);
        Ok(())
    }

    async fn touch_enrollment(
        &self,
        experiment: &str,
        participant: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut enrollment = self
            .enrollments
            .get_mut(&enrollment_key(experiment, participant))
            .ok_or_else(|| Error::NotFound {
                kind: "enrollment",
                name: format!("{experiment}/{participant}"),
            })?;
        enrollment.touch(now);
        Ok(())
    }

    async fn remove_enrollment(
        &self,
        experiment: &str,
        participant: &str,
    ) -> Result<Option<Enrollment>> {
        Ok(self
            .enrollments
            .remove(&enrollment_key(experiment, participant))
            .map(|(_, enrollment)| enrollment))
    }

    async fn enrollment_count(&self, experiment: &str) -> Result<usize> {
        Ok(self
            .enrollments
            .iter()
            .filter(|e| e.key().0 == experiment)
            .count())
    }
}
