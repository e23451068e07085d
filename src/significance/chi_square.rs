//! Pearson's chi-squared test of independence

use serde::{Deserialize, Serialize};

use super::gamma::chi_squared_sf;

/// Outcome of a chi-squared test on a contingency table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquare {
    /// Pearson statistic.
    pub statistic: f64,
    /// `(rows - 1) * (columns - 1)`.
    pub degrees_of_freedom: u64,
    /// Probability of a statistic at least this large under independence.
    pub p_value: f64,
}

/// Run the test on an `r x c` table of observed counts.
///
/// Expected frequencies come from the row and column marginals. No
/// continuity correction is applied.
///
/// Returns `None` when the table is smaller than 2x2, ragged, or has any
/// row or column total of zero.
#[must_use]
pub fn chi_square<R: AsRef<[u64]>>(table: &[R]) -> Option<ChiSquare> {
    let rows = table.len();
    let columns = table.first()?.as_ref().len();
    if rows < 2 || columns < 2 || table.iter().any(|row| row.as_ref().len() != columns) {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let row_totals: Vec<f64> = table
        .iter()
        .map(|row| row.as_ref().iter().sum::<u64>() as f64)
        .collect();
    #[allow(clippy::cast_precision_loss)]
    let column_totals: Vec<f64> = (0..columns)
        .map(|j| table.iter().map(|row| row.as_ref()[j]).sum::<u64>() as f64)
        .collect();
    if row_totals.iter().chain(&column_totals).any(|&t| t == 0.0) {
        return None;
    }
    let grand_total: f64 = row_totals.iter().sum();

    let mut statistic = 0.0;
    for (row, row_total) in table.iter().zip(&row_totals) {
        for (&observed, column_total) in row.as_ref().iter().zip(&column_totals) {
            let expected = row_total * column_total / grand_total;
            #[allow(clippy::cast_precision_loss)]
            let diff = observed as f64 - expected;
            statistic += diff * diff / expected;
        }
    }

    let degrees_of_freedom = ((rows - 1) * (columns - 1)) as u64;
    #[allow(clippy::cast_precision_loss)]
    let p_value = chi_squared_sf(statistic, degrees_of_freedom as f64);
    Some(ChiSquare {
        statistic,
        degrees_of_freedom,
        p_value,
    })
}

/// p-value of [`chi_square`], or `None` when the test is undefined.
#[must_use]
pub fn chi_square_p_value<R: AsRef<[u64]>>(table: &[R]) -> Option<f64> {
    chi_square(table).map(|result| result.p_value)
}
