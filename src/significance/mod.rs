//! Significance Engine
//!
//! Pure functions over counts and histograms. Every statistic that can be
//! undefined for its input (empty groups, zero marginals, no variance)
//! returns `Option`; `None` means "not enough data", never a failure.
//!
//! # Example
//!
//! ```rust
//! use trueno_experiments::significance::{chi_squared_confidence, improvement, rate};
//!
//! // control: 10 of 100 converted, treatment: 20 of 100
//! let control = rate(10, 100);
//! let treatment = rate(20, 100);
//! assert_eq!(improvement(treatment, control), Some(100.0));
//!
//! let confidence = chi_squared_confidence(100, 10, 100, 20).unwrap();
//! assert!(confidence > 95.0 && confidence < 96.0);
//! ```

mod chi_square;
mod gamma;
mod mann_whitney;

pub use chi_square::{chi_square, chi_square_p_value, ChiSquare};
pub use gamma::{chi_squared_sf, erfc, gamma_p, gamma_q, ln_gamma, normal_sf};
pub use mann_whitney::{mann_whitney, MannWhitney};

use crate::counter::Histogram;

/// Percentage of `trials` that succeeded, or `None` when there were no trials.
#[must_use]
pub fn rate(successes: u64, trials: u64) -> Option<f64> {
    if trials == 0 {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = 100.0 * successes as f64 / trials as f64;
    Some(rate)
}

/// Relative change of `treatment` over `control`, in percent.
///
/// `None` when either rate is undefined or the control rate is zero.
#[must_use]
pub fn improvement(treatment: Option<f64>, control: Option<f64>) -> Option<f64> {
    let control = control.filter(|&c| c != 0.0)?;
    let treatment = treatment?;
    Some(100.0 * (treatment - control) / control)
}

/// Mean actions per participant, 0 for an empty histogram.
#[must_use]
pub fn average_actions(histogram: &Histogram) -> f64 {
    let participants = histogram.participants();
    if participants == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let average = histogram.total_actions() as f64 / participants as f64;
    average
}

/// Goal histogram with its implicit zero bucket restored from the
/// participation count.
#[must_use]
pub fn fixup_distribution(goal: &Histogram, participants: u64) -> Histogram {
    goal.fixup(participants)
}

/// Chi-squared confidence that conversion differs between two groups.
///
/// Builds the table `[[non-converted, converted]]` for treatment then
/// control and returns `(1 - p) * 100`. Conversions above the participant
/// count are clamped so the table never goes negative.
#[must_use]
pub fn chi_squared_confidence(
    control_count: u64,
    control_conversions: u64,
    treatment_count: u64,
    treatment_conversions: u64,
) -> Option<f64> {
    let table = [
        [
            treatment_count.saturating_sub(treatment_conversions),
            treatment_conversions,
        ],
        [
            control_count.saturating_sub(control_conversions),
            control_conversions,
        ],
    ];
    chi_square_p_value(&table).map(|p| (1.0 - p) * 100.0)
}

/// Mann-Whitney confidence that two distributions differ.
///
/// Computed as `(1 - 2p) * 100` from the one-tailed p-value, so identical
/// distributions land near zero. The test has no direction: swapping `a`
/// and `b` gives the same value. Values below `floor` are raised to it.
#[must_use]
pub fn mann_whitney_confidence(a: &Histogram, b: &Histogram, floor: f64) -> Option<f64> {
    mann_whitney(a, b).map(|result| ((1.0 - 2.0 * result.one_tailed_p) * 100.0).max(floor))
}
