//! Property-based tests for trueno-experiments
//!
//! - Test mathematical invariants
//! - Test counter integrity properties
//! - Run with ProptestConfig::with_cases(100)

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;
use trueno_experiments::bucketing::{weighted_choice, SeededRandom};
use trueno_experiments::chart::{distributions_to_graph_table, points_with_surrounding_gaps};
use trueno_experiments::counter::{CounterKey, CounterStore, Histogram, MemoryCounterStore};
use trueno_experiments::significance::{chi_square_p_value, fixup_distribution, mann_whitney};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Histogram with up to 12 buckets over action counts 0..40
fn arb_histogram() -> impl Strategy<Value = Histogram> {
    proptest::collection::btree_map(0u64..40, 1u64..50, 0..12)
        .prop_map(|buckets| buckets.into_iter().collect())
}

/// Increment operations: (participant index, amount)
fn arb_increments() -> impl Strategy<Value = Vec<(u8, u64)>> {
    proptest::collection::vec((0u8..20, 0u64..5), 0..80)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Counter Store Properties
    // ========================================================================

    /// Property: histogram total equals the number of distinct participants
    /// with a non-zero count, and each frequency equals the sum of amounts
    #[test]
    fn prop_counter_tracks_every_participant(ops in arb_increments()) {
        let (total, frequencies, expected) = block_on(async {
            let store = MemoryCounterStore::new();
            let key = CounterKey::goal("exp", "alt", "goal");
            let mut expected: HashMap<String, u64> = HashMap::new();
            for (participant, amount) in &ops {
                let participant = format!("p{participant}");
                store.increment(&key, &participant, *amount).await.unwrap();
                *expected.entry(participant).or_default() += amount;
            }
            let mut frequencies = HashMap::new();
            for participant in expected.keys() {
                frequencies.insert(
                    participant.clone(),
                    store.get_frequency(&key, participant).await.unwrap(),
                );
            }
            (store.get(&key).await.unwrap(), frequencies, expected)
        });

        let non_zero = expected.values().filter(|&&count| count > 0).count() as u64;
        prop_assert_eq!(total, non_zero);
        prop_assert_eq!(frequencies, expected);
    }

    /// Property: clear removes exactly one participant and zeroes their count
    #[test]
    fn prop_clear_round_trip(ops in arb_increments(), victim in 0u8..20) {
        let (before, after, frequency, was_present, cleared) = block_on(async {
            let store = MemoryCounterStore::new();
            let key = CounterKey::participation("exp", "alt");
            for (participant, amount) in &ops {
                store.increment(&key, &format!("p{participant}"), *amount).await.unwrap();
            }
            let victim = format!("p{victim}");
            let was_present = store.get_frequency(&key, &victim).await.unwrap() > 0;
            let before = store.get(&key).await.unwrap();
            let cleared = store.clear(&key, &victim).await.unwrap();
            // A second clear is a no-op
            store.clear(&key, &victim).await.unwrap();
            let after = store.get(&key).await.unwrap();
            let frequency = store.get_frequency(&key, &victim).await.unwrap();
            (before, after, frequency, was_present, cleared)
        });

        prop_assert_eq!(frequency, 0);
        prop_assert_eq!(cleared, was_present);
        prop_assert_eq!(before - after, u64::from(was_present));
    }

    // ========================================================================
    // Significance Properties
    // ========================================================================

    /// Property: chi-squared p-value is a probability and ignores row order
    #[test]
    fn prop_chi_square_symmetric(a in 0u64..500, b in 0u64..500, c in 0u64..500, d in 0u64..500) {
        let forward = chi_square_p_value(&[[a, b], [c, d]]);
        let swapped = chi_square_p_value(&[[c, d], [a, b]]);
        prop_assert_eq!(forward.is_some(), swapped.is_some());
        if let (Some(forward), Some(swapped)) = (forward, swapped) {
            prop_assert!((0.0..=1.0).contains(&forward));
            prop_assert!((forward - swapped).abs() < 1e-9);
        }
    }

    /// Property: Mann-Whitney p-value is a probability and symmetric in its inputs
    #[test]
    fn prop_mann_whitney_symmetric(a in arb_histogram(), b in arb_histogram()) {
        let ab = mann_whitney(&a, &b);
        let ba = mann_whitney(&b, &a);
        prop_assert_eq!(ab.is_some(), ba.is_some());
        if let (Some(ab), Some(ba)) = (ab, ba) {
            prop_assert!((0.0..=1.0).contains(&ab.p_value));
            prop_assert!((ab.p_value - ba.p_value).abs() < 1e-9);
            let n1 = a.participants() as f64;
            let n2 = b.participants() as f64;
            prop_assert!((ab.u + ba.u - n1 * n2).abs() < 1e-6 * (n1 * n2).max(1.0));
        }
    }

    /// Property: fixup never loses participants and only touches bucket 0
    #[test]
    fn prop_fixup_restores_zero_bucket(goal in arb_histogram(), extra in 0u64..100) {
        let participants = goal.participants() + extra;
        let fixed = fixup_distribution(&goal, participants);
        prop_assert_eq!(fixed.participants(), participants);
        prop_assert_eq!(fixed.get(0), goal.get(0) + extra);
        for (actions, population) in goal.iter().filter(|&(actions, _)| actions > 0) {
            prop_assert_eq!(fixed.get(actions), population);
        }
    }

    // ========================================================================
    // Chart Properties
    // ========================================================================

    /// Property: gap filling keeps every input point, stays sorted, and only
    /// adds points adjacent to an input point
    #[test]
    fn prop_gap_filling(points in proptest::collection::btree_set(0u64..200, 0..30)) {
        let points: Vec<u64> = points.into_iter().collect();
        let filled = points_with_surrounding_gaps(&points);
        let input: BTreeSet<u64> = points.iter().copied().collect();

        prop_assert!(filled.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(points.iter().all(|p| filled.contains(p)));
        for x in &filled {
            let adjacent = input.contains(x)
                || input.contains(&(x + 1))
                || x.checked_sub(1).is_some_and(|prev| input.contains(&prev));
            prop_assert!(adjacent, "{} is not next to an input point", x);
        }
    }

    /// Property: chart fractions are probabilities that never increase with x
    #[test]
    fn prop_chart_is_survival_curve(a in arb_histogram(), b in arb_histogram(), threshold in 0u64..10) {
        let table = distributions_to_graph_table(
            &[("a".to_string(), a), ("b".to_string(), b)],
            threshold,
        );
        prop_assert!(table.rows().iter().all(|row| row.x() > 0));
        prop_assert!(table.rows().windows(2).all(|w| w[0].x() < w[1].x()));
        for column in 0..2 {
            let values: Vec<f64> = table.rows().iter().map(|row| row.values()[column]).collect();
            prop_assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
            prop_assert!(values.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    // ========================================================================
    // Bucketing Properties
    // ========================================================================

    /// Property: weighted choice never returns a zero-weight alternative
    #[test]
    fn prop_weighted_choice_skips_zero_weights(
        weights in proptest::collection::vec(prop_oneof![Just(0.0), 0.1f64..10.0], 1..8),
        seed in any::<u64>(),
    ) {
        let names: Vec<String> = (0..weights.len()).map(|i| format!("alt{i}")).collect();
        let choices: Vec<(&str, f64)> = names.iter().map(String::as_str).zip(weights.iter().copied()).collect();
        let random = SeededRandom::new(seed);

        match weighted_choice(&choices, &random) {
            Some(chosen) => {
                let weight = choices.iter().find(|(name, _)| *name == chosen).map(|(_, w)| *w);
                prop_assert!(weight.is_some_and(|w| w > 0.0));
            }
            None => prop_assert!(weights.iter().all(|&w| w == 0.0)),
        }
    }
}
