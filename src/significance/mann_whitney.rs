//! Mann-Whitney U test over compressed action-count distributions
//!
//! Both samples arrive as histograms, so ranks are assigned per distinct
//! value rather than per participant: every participant sharing a value
//! gets the average rank of that block of ties. Cost is linear in the
//! number of distinct values, independent of population size.

use serde::{Deserialize, Serialize};

use super::gamma::normal_sf;
use crate::counter::Histogram;

/// Outcome of a Mann-Whitney U test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannWhitney {
    /// U statistic of the first sample.
    pub u: f64,
    /// Continuity-corrected z score of `|U - mean|`.
    pub z: f64,
    /// Two-sided p-value from the normal approximation.
    pub p_value: f64,
    /// One-sided p-value in the observed direction.
    pub one_tailed_p: f64,
}

/// Compare two distributions.
///
/// Uses the normal approximation with tie and continuity correction; the
/// exact distribution of U is never computed.
///
/// Returns `None` when either histogram is empty or the pooled sample has
/// a single distinct value.
#[must_use]
pub fn mann_whitney(a: &Histogram, b: &Histogram) -> Option<MannWhitney> {
    let n1 = a.participants();
    let n2 = b.participants();
    if n1 == 0 || n2 == 0 {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let (n1, n2) = (n1 as f64, n2 as f64);
    let n = n1 + n2;

    let mut values: Vec<u64> = a.action_counts().chain(b.action_counts()).collect();
    values.sort_unstable();
    values.dedup();
    if values.len() < 2 {
        return None;
    }

    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut offset = 0.0;
    for value in values {
        #[allow(clippy::cast_precision_loss)]
        let (in_a, in_b) = (a.get(value) as f64, b.get(value) as f64);
        let ties = in_a + in_b;
        let average_rank = offset + (ties + 1.0) / 2.0;
        rank_sum_a += in_a * average_rank;
        tie_term += ties.powi(3) - ties;
        offset += ties;
    }

    let u = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let mean = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if variance <= 0.0 {
        return None;
    }

    let z = ((u - mean).abs() - 0.5) / variance.sqrt();
    let one_tailed_p = normal_sf(z);
    Some(MannWhitney {
        u,
        z,
        p_value: (2.0 * one_tailed_p).min(1.0),
        one_tailed_p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_rank_sum(a: &[u64], b: &[u64]) -> f64 {
        let mut pooled: Vec<(u64, bool)> = a.iter().map(|&v| (v, true)).collect();
        pooled.extend(b.iter().map(|&v| (v, false)));
        pooled.sort_unstable();

        let mut sum = 0.0;
        let mut i = 0;
        while i < pooled.len() {
            let mut j = i;
            while j < pooled.len() && pooled[j].0 == pooled[i].0 {
                j += 1;
            }
            let average = (i + 1 + j) as f64 / 2.0;
            sum += pooled[i..j].iter().filter(|(_, in_a)| *in_a).count() as f64 * average;
            i = j;
        }
        sum
    }

    fn histogram(values: &[u64]) -> Histogram {
        let mut histogram = Histogram::new();
        for &v in values {
            histogram.add(v, 1);
        }
        histogram
    }

    #[test]
    fn test_rank_sum_matches_per_participant_ranking() {
        let a = [0, 1, 1, 2, 5, 5, 5, 9];
        let b = [1, 2, 2, 3, 5, 7];
        let result = mann_whitney(&histogram(&a), &histogram(&b)).unwrap();
        let expected_u = naive_rank_sum(&a, &b) - 8.0 * 9.0 / 2.0;
        assert!((result.u - expected_u).abs() < 1e-9);
    }

    #[test]
    fn test_textbook_example() {
        // No ties: A = 1..=5, B = 6..=10, U = 0
        let a = histogram(&[1, 2, 3, 4, 5]);
        let b = histogram(&[6, 7, 8, 9, 10]);
        let result = mann_whitney(&a, &b).unwrap();
        assert!(result.u.abs() < 1e-12);
        // mean 12.5, sd sqrt(25 * 11 / 12), z = 12 / 4.787
        assert!((result.z - 2.506_718_2).abs() < 1e-6);
        assert!((result.p_value - 2.0 * result.one_tailed_p).abs() < 1e-12);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn test_symmetric_in_argument_order() {
        let a = Histogram::from([(0, 40), (1, 30), (2, 10)]);
        let b = Histogram::from([(0, 20), (1, 30), (3, 25)]);
        let ab = mann_whitney(&a, &b).unwrap();
        let ba = mann_whitney(&b, &a).unwrap();
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
        assert!((ab.u + ba.u - 80.0 * 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        let empty = Histogram::new();
        let some = Histogram::from([(1, 3)]);
        assert!(mann_whitney(&empty, &some).is_none());
        assert!(mann_whitney(&some, &empty).is_none());
        // Every participant did exactly the same thing
        assert!(mann_whitney(&some, &Histogram::from([(1, 7)])).is_none());
    }

    #[test]
    fn test_identical_distributions_are_not_significant() {
        let a = Histogram::from([(0, 10), (1, 10), (2, 10)]);
        let result = mann_whitney(&a, &a.clone()).unwrap();
        assert!(result.p_value > 0.9);
    }
}
