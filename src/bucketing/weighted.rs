//! Weighted random choice over experiment alternatives

use super::RandomSource;
use crate::experiment::{Alternative, Experiment};
use crate::{Error, Result};

/// Pick one of `choices` with probability proportional to its weight.
///
/// Draws `r` from `[0, total)` and walks the choices in order, returning the
/// first one whose cumulative weight reaches `r`. Zero-weight choices are
/// never returned. Returns `None` when the weights sum to zero.
#[must_use]
pub fn weighted_choice<'a, T: ?Sized>(
    choices: &[(&'a T, f64)],
    random: &dyn RandomSource,
) -> Option<&'a T> {
    let total: f64 = choices.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }

    let r = random.uniform(0.0, total);
    let mut upto = 0.0;
    let mut last_positive = None;
    for &(choice, weight) in choices {
        if weight <= 0.0 {
            continue;
        }
        upto += weight;
        last_positive = Some(choice);
        if upto >= r {
            return Some(choice);
        }
    }
    // Float rounding can leave `upto` a hair below `r`
    last_positive
}

/// Choose an alternative for a new participant.
///
/// Enabled alternatives are considered in experiment order. If every one of
/// them carries a weight the choice is weighted, otherwise uniform.
///
/// # Errors
///
/// - `Error::NoAlternativesAvailable` if no alternative is enabled
/// - `Error::DegenerateWeights` if every enabled weight is zero
pub fn choose_alternative(experiment: &Experiment, random: &dyn RandomSource) -> Result<String> {
    let enabled: Vec<&Alternative> = experiment.enabled_alternatives().collect();
    if enabled.is_empty() {
        return Err(Error::NoAlternativesAvailable(experiment.name().to_string()));
    }

    let weights: Option<Vec<(&str, f64)>> = enabled
        .iter()
        .map(|alt| alt.weight().map(|w| (alt.name(), w)))
        .collect();

    let chosen = match weights {
        Some(weights) => weighted_choice(&weights, random).ok_or_else(|| {
            tracing::warn!(experiment = experiment.name(), "all alternative weights are zero");
            Error::DegenerateWeights(experiment.name().to_string())
        })?,
        None => {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let index = random.uniform(0.0, enabled.len() as f64) as usize;
            enabled[index.min(enabled.len() - 1)].name()
        }
    };
    Ok(chosen.to_string())
}
