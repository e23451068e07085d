//! End-to-end experiment lifecycle
//!
//! Enroll participants concurrently, record goals, compile the report and
//! check it against the counters that fed it.

use std::sync::Arc;

use trueno_experiments::bucketing::SeededRandom;
use trueno_experiments::config::{Config, GoalCatalog};
use trueno_experiments::counter::{CounterKey, CounterStore, MemoryCounterStore};
use trueno_experiments::experiment::{
    Alternative, Experiment, ExperimentState, ExperimentStore, MemoryExperimentStore,
};
use trueno_experiments::report::Report;
use trueno_experiments::ExperimentEngine;

type Engine = ExperimentEngine<MemoryCounterStore, MemoryExperimentStore>;

async fn engine_with_experiment() -> anyhow::Result<Engine> {
    let engine = ExperimentEngine::builder(MemoryCounterStore::new(), MemoryExperimentStore::new())
        .config(Config::default().goals(GoalCatalog::new(["signup", "pageview"])))
        .random(Arc::new(SeededRandom::new(2024)))
        .build()?;

    engine
        .save_experiment(
            Experiment::builder("homepage")
                .description("hero layout test")
                .alternative(Alternative::weighted("control", 1.0))
                .alternative(Alternative::weighted("wide_hero", 1.0))
                .chi2_goal("signup")
                .mwu_goal("pageview")
                .state(ExperimentState::Enabled)
                .build()?,
        )
        .await?;
    Ok(engine)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_lifecycle() -> anyhow::Result<()> {
    let engine = Arc::new(engine_with_experiment().await?);

    let mut handles = vec![];
    for i in 0..400 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let participant = format!("user-{i}");
            let alternative = engine.assign("homepage", &participant).await?;
            if alternative == "wide_hero" {
                if i % 4 == 0 {
                    engine
                        .record_goal("homepage", &alternative, "signup", &participant, 1)
                        .await?;
                }
                engine
                    .record_goal("homepage", &alternative, "pageview", &participant, 3)
                    .await?;
            } else {
                if i % 10 == 0 {
                    engine
                        .record_goal("homepage", &alternative, "signup", &participant, 1)
                        .await?;
                }
                if i % 2 == 0 {
                    engine
                        .record_goal("homepage", &alternative, "pageview", &participant, 1)
                        .await?;
                }
            }
            Ok::<_, trueno_experiments::Error>(alternative)
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(engine.store().enrollment_count("homepage").await?, 400);
    let control = engine.participant_count("homepage", "control").await?;
    let wide = engine.participant_count("homepage", "wide_hero").await?;
    assert_eq!(control + wide, 400);

    let report = engine.compute_report("homepage").await?;
    assert_eq!(report.experiment.name, "homepage");
    assert_eq!(report.experiment.alternatives, "control,wide_hero");
    assert_eq!(report.control_participants, control);
    assert_eq!(report.results.len(), 2);

    let signup = report.goal("signup").expect("signup result");
    assert_eq!(
        signup.control.conversions,
        engine.goal_count("homepage", "control", "signup").await?
    );
    let wide_signup = signup.alternative("wide_hero").expect("wide_hero stats");
    assert!(wide_signup.confidence.is_some());
    assert!(wide_signup.mann_whitney_confidence.is_none());

    let pageview = report.goal("pageview").expect("pageview result");
    let wide_pageview = pageview.alternative("wide_hero").expect("wide_hero stats");
    assert!((wide_pageview.average_goal_actions.expect("average") - 3.0).abs() < 1e-12);
    assert!(wide_pageview.mann_whitney_confidence.expect("confidence") > 99.0);
    let chart = pageview.mwu_histogram.as_ref().expect("chart");
    assert_eq!(chart.rows().first().map(|row| row.x()), Some(1));
    assert_eq!(chart.rows().last().map(|row| row.x()), Some(3));

    let json = report.to_json()?;
    let parsed: Report = serde_json::from_str(&json)?;
    assert_eq!(parsed, report);
    Ok(())
}

#[tokio::test]
async fn test_reassignment_is_stable_across_state_changes() -> anyhow::Result<()> {
    let engine = engine_with_experiment().await?;
    let first = engine.assign("homepage", "alice").await?;

    engine.set_state("homepage", ExperimentState::Control).await?;
    assert_eq!(engine.alternative_for("homepage", "alice").await?, "control");
    assert!(engine.assign("homepage", "bob").await.is_err());

    engine.set_state("homepage", ExperimentState::Enabled).await?;
    assert_eq!(engine.assign("homepage", "alice").await?, first);
    assert_eq!(engine.store().enrollment_count("homepage").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_remove_participant_round_trip() -> anyhow::Result<()> {
    let engine = engine_with_experiment().await?;
    let alternative = engine.assign("homepage", "carol").await?;
    engine.assign("homepage", "dave").await?;
    engine
        .record_goal("homepage", &alternative, "pageview", "carol", 5)
        .await?;

    let before = engine.participant_count("homepage", &alternative).await?;
    engine.remove_participant("homepage", &alternative, "carol").await?;

    assert_eq!(engine.participant_count("homepage", &alternative).await?, before - 1);
    let key = CounterKey::goal("homepage", &alternative, "pageview");
    assert_eq!(engine.counters().get_frequency(&key, "carol").await?, 0);
    assert_eq!(engine.counters().get(&key).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_delete_experiment() -> anyhow::Result<()> {
    let engine = engine_with_experiment().await?;
    engine.assign("homepage", "erin").await?;
    engine.delete_experiment("homepage").await?;

    assert!(engine.compute_report("homepage").await.is_err());
    assert!(engine.store().get_enrollment("homepage", "erin").await?.is_none());
    Ok(())
}
