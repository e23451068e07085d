//! Experiment reports
//!
//! A [`Report`] is a plain serializable document: per goal, the control
//! group's numbers and each alternative's numbers against it. Statistics
//! that are undefined for the data collected so far are `None`; renderers
//! show them as "not enough data".

mod compiler;

pub use compiler::ReportCompiler;

use serde::{Deserialize, Serialize};

use crate::chart::GraphTable;
use crate::experiment::ExperimentSummary;

/// Participant total for one alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeParticipants {
    /// Alternative name.
    pub name: String,
    /// Participants counted for it.
    pub participants: u64,
}

/// Control group numbers for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlStats {
    /// Participants who reached the goal at least once.
    pub conversions: u64,
    /// `conversions / participants` in percent.
    pub conversion_rate: Option<f64>,
    /// Mean goal actions per participant (Mann-Whitney goals only).
    pub average_goal_actions: Option<f64>,
}

/// One alternative's numbers for one goal, compared against control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeStats {
    /// Alternative name.
    pub name: String,
    /// Participants who reached the goal at least once.
    pub conversions: u64,
    /// `conversions / participants` in percent.
    pub conversion_rate: Option<f64>,
    /// Relative change of the conversion rate over control, in percent.
    pub improvement: Option<f64>,
    /// Chi-squared confidence on conversion, 0-100.
    pub confidence: Option<f64>,
    /// Mean goal actions per participant (Mann-Whitney goals only).
    pub average_goal_actions: Option<f64>,
    /// Mann-Whitney confidence on the action distribution (Mann-Whitney goals only).
    pub mann_whitney_confidence: Option<f64>,
}

/// Results for one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalResult {
    /// Goal name.
    pub goal: String,
    /// Control group numbers.
    pub control: ControlStats,
    /// Non-control alternatives, sorted by name.
    pub alternatives: Vec<AlternativeStats>,
    /// Whether the experiment lists this goal as relevant. Every goal is
    /// relevant when the experiment lists none.
    pub relevant: bool,
    /// Whether distribution statistics were computed.
    pub mwu: bool,
    /// Survival chart of the goal distributions (Mann-Whitney goals only).
    pub mwu_histogram: Option<GraphTable>,
}

impl GoalResult {
    /// Stats for one alternative by name.
    #[must_use]
    pub fn alternative(&self, name: &str) -> Option<&AlternativeStats> {
        self.alternatives.iter().find(|alt| alt.name == name)
    }
}

/// Full experiment report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Experiment header.
    pub experiment: ExperimentSummary,
    /// Participant totals for every alternative, sorted by name.
    pub alternatives: Vec<AlternativeParticipants>,
    /// Participants in the control group.
    pub control_participants: u64,
    /// One entry per catalog goal, in catalog order.
    pub results: Vec<GoalResult>,
}

impl Report {
    /// Results for one goal by name.
    #[must_use]
    pub fn goal(&self, name: &str) -> Option<&GoalResult> {
        self.results.iter().find(|result| result.goal == name)
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if encoding fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
