//! Tests for the top-level ExperimentEngine API

use std::sync::Arc;

use trueno_experiments::bucketing::{FixedClock, SeededRandom, StaticFlags};
use trueno_experiments::config::{Config, GoalCatalog};
use trueno_experiments::counter::MemoryCounterStore;
use trueno_experiments::experiment::MemoryExperimentStore;
use trueno_experiments::{Error, ExperimentEngine};

fn stores() -> (MemoryCounterStore, MemoryExperimentStore) {
    (MemoryCounterStore::new(), MemoryExperimentStore::new())
}

#[test]
fn test_engine_builder_defaults() {
    let (counters, store) = stores();
    let engine = ExperimentEngine::builder(counters, store).build().unwrap();
    assert_eq!(engine.config(), &Config::default());
    assert_eq!(engine.config().control_group_name(), "control");
}

#[test]
fn test_engine_builder_chain() {
    let (counters, store) = stores();
    let config = Config::default()
        .control_group("baseline")
        .goals(GoalCatalog::new(["signup", "purchase"]))
        .min_actions_to_show(5);

    let engine = ExperimentEngine::builder(counters, store)
        .config(config)
        .random(Arc::new(SeededRandom::new(1)))
        .flags(Arc::new(StaticFlags::new()))
        .clock(Arc::new(FixedClock(chrono::Utc::now())))
        .build()
        .unwrap();

    assert_eq!(engine.config().control_group_name(), "baseline");
    assert_eq!(engine.config().goal_catalog().len(), 2);
    assert_eq!(engine.config().min_actions_threshold(), 5);
}

#[test]
fn test_engine_build_rejects_blank_control_group() {
    let (counters, store) = stores();
    let result = ExperimentEngine::builder(counters, store)
        .config(Config::default().control_group("   "))
        .build();
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}
