//! Report compilation
//!
//! Two phases: an async snapshot of every counter the report needs, then a
//! pure per-goal computation. Counters are read key by key while writers
//! keep running, so a report reflects roughly "now" rather than a single
//! consistent instant.

use std::collections::HashSet;

use crate::chart::distributions_to_graph_table;
use crate::config::{Config, GoalCatalog};
use crate::counter::{CounterKey, CounterStore, Histogram};
use crate::experiment::Experiment;
use crate::significance::{
    average_actions, chi_squared_confidence, fixup_distribution, improvement,
    mann_whitney_confidence, rate,
};
use crate::Result;

use super::{AlternativeParticipants, AlternativeStats, ControlStats, GoalResult, Report};

/// Counter values for one alternative and one goal.
struct ArmSnapshot {
    name: String,
    participants: u64,
    conversions: u64,
    distribution: Option<Histogram>,
}

impl ArmSnapshot {
    /// Distribution with non-converting participants restored to bucket 0.
    fn fixed_distribution(&self) -> Option<Histogram> {
        self.distribution
            .as_ref()
            .map(|d| fixup_distribution(d, self.participants))
    }
}

struct GoalSnapshot {
    goal: String,
    relevant: bool,
    mwu: bool,
    control: ArmSnapshot,
    alternatives: Vec<ArmSnapshot>,
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    min_actions: u64,
    confidence_floor: f64,
}

/// Builds [`Report`]s from a counter store.
#[derive(Debug)]
pub struct ReportCompiler<'a, C> {
    counters: &'a C,
    control_group: &'a str,
    thresholds: Thresholds,
}

impl<'a, C: CounterStore> ReportCompiler<'a, C> {
    /// Create a compiler reading from `counters` with settings from `config`.
    #[must_use]
    pub fn new(counters: &'a C, config: &'a Config) -> Self {
        Self {
            counters,
            control_group: config.control_group_name(),
            thresholds: Thresholds {
                min_actions: config.min_actions_threshold(),
                confidence_floor: config.confidence_floor(),
            },
        }
    }

    /// Compile the report for `experiment` over every goal in `goals`.
    ///
    /// # Errors
    ///
    /// Propagates counter store errors. Undefined statistics are `None`
    /// in the report, never an error.
    pub async fn compile(&self, experiment: &Experiment, goals: &GoalCatalog) -> Result<Report> {
        let mut names: Vec<&str> = experiment.alternatives().iter().map(|a| a.name()).collect();
        names.sort_unstable();

        let mut alternatives = Vec::with_capacity(names.len());
        for &name in &names {
            let participants = self.participants(experiment.name(), name).await?;
            alternatives.push(AlternativeParticipants {
                name: name.to_string(),
                participants,
            });
        }
        let control_participants = match alternatives.iter().find(|a| a.name == self.control_group) {
            Some(control) => control.participants,
            None => self.participants(experiment.name(), self.control_group).await?,
        };

        let relevant_goals: HashSet<&str> = experiment
            .relevant_chi2_goals()
            .iter()
            .chain(experiment.relevant_mwu_goals())
            .map(String::as_str)
            .collect();

        let mut snapshots = Vec::with_capacity(goals.len());
        for goal in goals.iter() {
            let mwu = experiment.relevant_mwu_goals().iter().any(|g| g == goal);
            let control = self
                .arm(experiment.name(), self.control_group, control_participants, goal, mwu)
                .await?;
            let mut arms = Vec::with_capacity(names.len());
            for participants in alternatives.iter().filter(|a| a.name != self.control_group) {
                arms.push(
                    self.arm(experiment.name(), &participants.name, participants.participants, goal, mwu)
                        .await?,
                );
            }
            snapshots.push(GoalSnapshot {
                goal: goal.to_string(),
                relevant: relevant_goals.is_empty() || relevant_goals.contains(goal),
                mwu,
                control,
                alternatives: arms,
            });
        }

        let results = compute_results(snapshots, self.thresholds);
        tracing::debug!(
            experiment = experiment.name(),
            goals = results.len(),
            control_participants,
            "compiled report"
        );

        Ok(Report {
            experiment: experiment.to_summary(self.control_group),
            alternatives,
            control_participants,
            results,
        })
    }

    async fn participants(&self, experiment: &str, alternative: &str) -> Result<u64> {
        self.counters
            .get(&CounterKey::participation(experiment, alternative))
            .await
    }

    async fn arm(
        &self,
        experiment: &str,
        alternative: &str,
        participants: u64,
        goal: &str,
        mwu: bool,
    ) -> Result<ArmSnapshot> {
        let key = CounterKey::goal(experiment, alternative, goal);
        let conversions = self.counters.get(&key).await?;
        let distribution = if mwu {
            Some(self.counters.get_frequencies(&key).await?)
        } else {
            None
        };
        Ok(ArmSnapshot {
            name: alternative.to_string(),
            participants,
            conversions,
            distribution,
        })
    }
}

#[cfg(feature = "rayon")]
fn compute_results(snapshots: Vec<GoalSnapshot>, thresholds: Thresholds) -> Vec<GoalResult> {
    use rayon::prelude::*;
    snapshots
        .into_par_iter()
        .map(|snapshot| goal_result(snapshot, thresholds))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn compute_results(snapshots: Vec<GoalSnapshot>, thresholds: Thresholds) -> Vec<GoalResult> {
    snapshots
        .into_iter()
        .map(|snapshot| goal_result(snapshot, thresholds))
        .collect()
}

fn goal_result(snapshot: GoalSnapshot, thresholds: Thresholds) -> GoalResult {
    let control = &snapshot.control;
    let control_rate = rate(control.conversions, control.participants);
    let control_distribution = control.fixed_distribution();

    let mut chart_series = Vec::new();
    if let Some(distribution) = &control_distribution {
        chart_series.push((control.name.clone(), distribution.clone()));
    }

    let alternatives = snapshot
        .alternatives
        .iter()
        .map(|arm| {
            let conversion_rate = rate(arm.conversions, arm.participants);
            let distribution = arm.fixed_distribution();
            let mann_whitney = match (&distribution, &control_distribution) {
                (Some(alt), Some(control)) => {
                    mann_whitney_confidence(alt, control, thresholds.confidence_floor)
                }
                _ => None,
            };
            let average_goal_actions = distribution.as_ref().map(average_actions);
            if let Some(distribution) = distribution {
                chart_series.push((arm.name.clone(), distribution));
            }
            AlternativeStats {
                name: arm.name.clone(),
                conversions: arm.conversions,
                conversion_rate,
                improvement: improvement(conversion_rate, control_rate),
                confidence: chi_squared_confidence(
                    control.participants,
                    control.conversions,
                    arm.participants,
                    arm.conversions,
                ),
                average_goal_actions,
                mann_whitney_confidence: mann_whitney,
            }
        })
        .collect();

    let mwu_histogram = snapshot
        .mwu
        .then(|| distributions_to_graph_table(&chart_series, thresholds.min_actions));

    GoalResult {
        control: ControlStats {
            conversions: control.conversions,
            conversion_rate: control_rate,
            average_goal_actions: control_distribution.as_ref().map(average_actions),
        },
        goal: snapshot.goal,
        alternatives,
        relevant: snapshot.relevant,
        mwu: snapshot.mwu,
        mwu_histogram,
    }
}
