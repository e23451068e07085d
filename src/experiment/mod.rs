//! Experiment schema and persistence seam
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Alternative (N) [ordered, name-unique]
//!      │
//!      └──< Enrollment (N) [one per participant, immutable alternative]
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_experiments::experiment::{Alternative, Experiment, ExperimentState};
//!
//! let mut experiment = Experiment::builder("checkout_button")
//!     .alternative(Alternative::weighted("control", 1.0))
//!     .alternative(Alternative::weighted("green", 3.0))
//!     .chi2_goal("purchase")
//!     .build()?;
//!
//! experiment.set_state(ExperimentState::Enabled, chrono::Utc::now())?;
//! assert!(experiment.is_weighted());
//! # Ok::<(), trueno_experiments::Error>(())
//! ```

mod alternative;
mod enrollment_record;
mod experiment_record;
mod memory;
mod store;

pub use alternative::Alternative;
pub use enrollment_record::Enrollment;
pub use experiment_record::{Experiment, ExperimentBuilder, ExperimentState, ExperimentSummary};
pub use memory::MemoryExperimentStore;
pub use store::{Enrolled, ExperimentStore};
