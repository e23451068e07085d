//! Engine configuration
//!
//! Loaded from JSON (every field optional) or assembled with chained setters.
//!
//! ```rust
//! use trueno_experiments::config::{Config, GoalCatalog};
//!
//! let config = Config::default()
//!     .goals(GoalCatalog::new(["signup", "purchase"]))
//!     .min_actions_to_show(5);
//! assert_eq!(config.control_group_name(), "control");
//! assert_eq!(config.goal_catalog().len(), 2);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Reserved name of the baseline alternative.
pub const DEFAULT_CONTROL_GROUP: &str = "control";

/// Minimum raw population at an action count for the chart to extend that far.
pub const DEFAULT_MIN_ACTIONS_TO_SHOW: u64 = 3;

/// Retries before a contended atomic update is surfaced as `ConcurrencyConflict`.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 8;

/// Ordered, deduplicated catalog of trackable goal names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct GoalCatalog {
    goals: Vec<String>,
}

impl GoalCatalog {
    /// Build a catalog, keeping the first occurrence of each name.
    #[must_use]
    pub fn new<I, S>(goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for goal in goals {
            catalog.push(goal);
        }
        catalog
    }

    /// Append a goal unless it is already present.
    pub fn push(&mut self, goal: impl Into<String>) {
        let goal = goal.into();
        if !self.contains(&goal) {
            self.goals.push(goal);
        }
    }

    /// Whether `goal` is in the catalog.
    #[must_use]
    pub fn contains(&self, goal: &str) -> bool {
        self.goals.iter().any(|g| g == goal)
    }

    /// Iterate goal names in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.goals.iter().map(String::as_str)
    }

    /// Number of goals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

impl From<Vec<String>> for GoalCatalog {
    fn from(goals: Vec<String>) -> Self {
        Self::new(goals)
    }
}

impl From<GoalCatalog> for Vec<String> {
    fn from(catalog: GoalCatalog) -> Self {
        catalog.goals
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    control_group: String,
    goals: GoalCatalog,
    min_actions_to_show: u64,
    mann_whitney_confidence_floor: f64,
    max_conflict_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_group: DEFAULT_CONTROL_GROUP.to_string(),
            goals: GoalCatalog::default(),
            min_actions_to_show: DEFAULT_MIN_ACTIONS_TO_SHOW,
            mann_whitney_confidence_floor: 0.0,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }
}

impl Config {
    /// Parse a configuration from a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the document is not valid JSON or
    /// a field has the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        tracing::debug!(
            goals = config.goals.len(),
            control_group = %config.control_group,
            "loaded experiments config"
        );
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, or
    /// `Error::Serialization` if it cannot be parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Set the reserved control alternative name.
    #[must_use]
    pub fn control_group(mut self, name: impl Into<String>) -> Self {
        self.control_group = name.into();
        self
    }

    /// Set the goal catalog.
    #[must_use]
    pub fn goals(mut self, goals: GoalCatalog) -> Self {
        self.goals = goals;
        self
    }

    /// Set the chart truncation threshold.
    #[must_use]
    pub const fn min_actions_to_show(mut self, threshold: u64) -> Self {
        self.min_actions_to_show = threshold;
        self
    }

    /// Set the floor applied to negative Mann-Whitney confidence values.
    #[must_use]
    pub fn mann_whitney_confidence_floor(mut self, floor: f64) -> Self {
        self.mann_whitney_confidence_floor = floor;
        self
    }

    /// Set the retry budget for contended atomic updates.
    #[must_use]
    pub const fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Reserved control alternative name.
    #[must_use]
    pub fn control_group_name(&self) -> &str {
        &self.control_group
    }

    /// Goal catalog.
    #[must_use]
    pub const fn goal_catalog(&self) -> &GoalCatalog {
        &self.goals
    }

    /// Chart truncation threshold.
    #[must_use]
    pub const fn min_actions_threshold(&self) -> u64 {
        self.min_actions_to_show
    }

    /// Floor for negative Mann-Whitney confidence.
    #[must_use]
    pub fn confidence_floor(&self) -> f64 {
        self.mann_whitney_confidence_floor
    }

    /// Retry budget for contended atomic updates.
    #[must_use]
    pub const fn conflict_retries(&self) -> u32 {
        self.max_conflict_retries
    }
}
