//! Error types for trueno-experiments
//!
//! Configuration and state errors are raised to the caller. A significance
//! test without a defined answer is never an error: those paths return
//! `Option::None` instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-experiments error types
#[derive(Error, Debug)]
pub enum Error {
    /// A named entity was looked up but does not exist
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Entity kind ("experiment", "enrollment", ...)
        kind: &'static str,
        /// Name or identifier that was looked up
        name: String,
    },

    /// Experiment definition violates an invariant (rejected at edit time)
    #[error("Invalid experiment configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation not allowed in the experiment's current state
    #[error("Experiment '{experiment}' is in state {state}: cannot {operation}")]
    InvalidState {
        /// Experiment name
        experiment: String,
        /// Current state
        state: String,
        /// Attempted operation
        operation: &'static str,
    },

    /// Experiment has no enabled alternative to assign
    #[error("No alternatives available for experiment '{0}'\nEnable at least one alternative before enrolling participants")]
    NoAlternativesAvailable(String),

    /// Every enabled alternative carries a weight of exactly zero
    #[error("All alternative weights are zero for experiment '{0}'\nGive at least one alternative a positive weight")]
    DegenerateWeights(String),

    /// Atomic update could not be applied after bounded retries
    #[error("Concurrency conflict on '{key}' after {attempts} attempts\nRetry the operation")]
    ConcurrencyConflict {
        /// Contended key
        key: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a missing experiment.
    #[must_use]
    pub fn experiment_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "experiment",
            name: name.into(),
        }
    }
}
