//! Rank equivalence tests
//!
//! The Mann-Whitney implementation ranks compressed histograms. These tests
//! check it against a reference that expands every participant and ranks
//! the raw samples one by one.

use quickcheck::{QuickCheck, TestResult};
use trueno_experiments::counter::Histogram;
use trueno_experiments::significance::{mann_whitney, normal_sf};

/// Reference Mann-Whitney on raw samples: per-participant average ranks,
/// tie-corrected variance, continuity correction.
fn naive_mann_whitney(a: &[u64], b: &[u64]) -> Option<(f64, f64)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut pooled: Vec<(u64, usize)> = a.iter().map(|&v| (v, 0)).collect();
    pooled.extend(b.iter().map(|&v| (v, 1)));
    pooled.sort_unstable();

    let mut ranks = vec![0.0; pooled.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < pooled.len() {
        let mut j = i;
        while j < pooled.len() && pooled[j].0 == pooled[i].0 {
            j += 1;
        }
        let average = (i + j + 1) as f64 / 2.0;
        for rank in &mut ranks[i..j] {
            *rank = average;
        }
        let t = (j - i) as f64;
        tie_term += t * t * t - t;
        i = j;
    }

    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;
    let rank_sum: f64 = pooled
        .iter()
        .zip(&ranks)
        .filter(|((_, group), _)| *group == 0)
        .map(|(_, rank)| rank)
        .sum();
    let u = rank_sum - n1 * (n1 + 1.0) / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return None;
    }
    let z = ((u - n1 * n2 / 2.0).abs() - 0.5) / variance.sqrt();
    Some((u, (2.0 * normal_sf(z)).min(1.0)))
}

fn to_histogram(samples: &[u64]) -> Histogram {
    let mut histogram = Histogram::new();
    for &sample in samples {
        histogram.add(sample, 1);
    }
    histogram
}

fn histogram_matches_naive(a: Vec<u8>, b: Vec<u8>) -> TestResult {
    // Small value range forces plenty of ties
    let a: Vec<u64> = a.into_iter().map(|v| u64::from(v % 16)).collect();
    let b: Vec<u64> = b.into_iter().map(|v| u64::from(v % 16)).collect();

    let fast = mann_whitney(&to_histogram(&a), &to_histogram(&b));
    let slow = naive_mann_whitney(&a, &b);
    match (fast, slow) {
        (None, None) => TestResult::passed(),
        (Some(fast), Some((u, p))) => {
            TestResult::from_bool((fast.u - u).abs() < 1e-6 && (fast.p_value - p).abs() < 1e-9)
        }
        _ => TestResult::failed(),
    }
}

#[test]
fn test_histogram_ranks_match_naive_ranks() {
    QuickCheck::new()
        .tests(500)
        .quickcheck(histogram_matches_naive as fn(Vec<u8>, Vec<u8>) -> TestResult);
}

#[test]
fn test_large_population_matches_naive() {
    // Thousands of participants, a handful of distinct values
    let a: Vec<u64> = (0..3000).map(|i| i % 5).collect();
    let b: Vec<u64> = (0..2500).map(|i| (i % 7).min(5)).collect();

    let fast = mann_whitney(&to_histogram(&a), &to_histogram(&b)).unwrap();
    let (u, p) = naive_mann_whitney(&a, &b).unwrap();
    assert!((fast.u - u).abs() < 1e-6);
    assert!((fast.p_value - p).abs() < 1e-9);
}
