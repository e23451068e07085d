//! # Trueno-Experiments: Split-Testing Engine
//!
//! **Version**: 0.1.0
//!
//! Trueno-Experiments runs A/B and multivariate experiments: it buckets
//! participants into weighted alternatives, counts goal actions as full
//! per-participant histograms, and reports whether alternatives differ
//! significantly from control.
//!
//! ## Components
//!
//! - **Counter store** ([`counter`]): concurrent key → histogram store
//! - **Bucketing** ([`bucketing`]): idempotent weighted assignment
//! - **Significance** ([`significance`]): chi-squared and Mann-Whitney U
//! - **Chart** ([`chart`]): gap-filled, truncated survival curves
//! - **Report** ([`report`]): per-goal results assembled from all of the above
//!
//! Storage is injected through the [`counter::CounterStore`] and
//! [`experiment::ExperimentStore`] traits; in-memory implementations ship
//! with the crate.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use trueno_experiments::config::{Config, GoalCatalog};
//! use trueno_experiments::counter::MemoryCounterStore;
//! use trueno_experiments::experiment::{Alternative, Experiment, ExperimentState, MemoryExperimentStore};
//! use trueno_experiments::ExperimentEngine;
//!
//! # async fn example() -> trueno_experiments::Result<()> {
//! let engine = ExperimentEngine::builder(MemoryCounterStore::new(), MemoryExperimentStore::new())
//!     .config(Config::default().goals(GoalCatalog::new(["purchase"])))
//!     .build()?;
//!
//! engine
//!     .save_experiment(
//!         Experiment::builder("checkout_flow")
//!             .alternative(Alternative::weighted("control", 1.0))
//!             .alternative(Alternative::weighted("one_page", 3.0))
//!             .chi2_goal("purchase")
//!             .state(ExperimentState::Enabled)
//!             .build()?,
//!     )
//!     .await?;
//!
//! let alternative = engine.assign("checkout_flow", "user-7").await?;
//! engine.record_goal("checkout_flow", &alternative, "purchase", "user-7", 1).await?;
//!
//! let report = engine.compute_report("checkout_flow").await?;
//! for result in &report.results {
//!     println!("{}: {:?}", result.goal, result.control.conversion_rate);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod bucketing;
pub mod chart;
pub mod config;
pub mod counter;
mod engine;
pub mod error;
pub mod experiment;
pub mod report;
pub mod significance;
pub mod telemetry;

pub use engine::{ExperimentEngine, ExperimentEngineBuilder};
pub use error::{Error, Result};
