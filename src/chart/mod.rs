//! Distribution-to-Chart Transform
//!
//! Turns per-alternative action histograms into survival curves: for every
//! action count `x`, the fraction of each alternative's participants who
//! acted at least `x` times.
//!
//! Three things keep the chart honest:
//!
//! - empty stretches of the x-axis are bracketed by zero-slope points so a
//!   line renderer does not draw a misleading ramp across them
//! - the tail is cut where no series has enough participants to matter
//! - the `x = 0` row is dropped since it is always 100%
//!
//! # Example
//!
//! ```rust
//! use trueno_experiments::chart::distributions_to_graph_table;
//! use trueno_experiments::counter::Histogram;
//!
//! let series = vec![
//!     ("control".to_string(), Histogram::from([(0, 5), (1, 3), (2, 2)])),
//!     ("blue".to_string(), Histogram::from([(0, 2), (1, 4), (3, 4)])),
//! ];
//! let table = distributions_to_graph_table(&series, 3);
//! assert_eq!(
//!     table.to_json().unwrap(),
//!     r#"[["x","control","blue"],[1,0.5,0.8],[2,0.2,0.4],[3,0.0,0.4]]"#
//! );
//! ```

mod table;

pub use table::{GraphRow, GraphTable};

use crate::counter::Histogram;

/// Fill gaps in an ascending list of points.
///
/// A gap of exactly two gets its single missing point; a wider gap gets one
/// point right after its start and one right before its end.
/// `[1, 2, 3, 10, 11, 13]` becomes `[1, 2, 3, 4, 9, 10, 11, 12, 13]`.
#[must_use]
pub fn points_with_surrounding_gaps(points: &[u64]) -> Vec<u64> {
    let mut filled = Vec::with_capacity(points.len() * 2);
    let mut last: Option<u64> = None;
    for &point in points {
        if let Some(last) = last {
            match point.saturating_sub(last) {
                0 | 1 => {}
                2 => filled.push(last + 1),
                _ => {
                    filled.push(last + 1);
                    filled.push(point - 1);
                }
            }
        }
        filled.push(point);
        last = Some(point);
    }
    filled
}

/// Build the chart table for named distributions.
///
/// `series` is rendered in the given order. Each fraction is normalized by
/// that series' participant count (a series with no participants yields
/// zeros). Rows beyond the largest `x` at which some series has at least
/// `min_actions` participants are dropped, as is `x = 0`.
///
/// No point is inserted before the smallest observed count, so the first
/// row can lie above `x = 1`; renderers should not assume the curve starts
/// at 1.
#[must_use]
pub fn distributions_to_graph_table(series: &[(String, Histogram)], min_actions: u64) -> GraphTable {
    let mut raw_points: Vec<u64> = series
        .iter()
        .flat_map(|(_, histogram)| histogram.action_counts())
        .collect();
    raw_points.sort_unstable();
    raw_points.dedup();

    let last_point = raw_points
        .iter()
        .copied()
        .filter(|&x| {
            series
                .iter()
                .map(|(_, histogram)| histogram.get(x))
                .max()
                .is_some_and(|population| population >= min_actions)
        })
        .max()
        .unwrap_or(0);

    let points = points_with_surrounding_gaps(&raw_points);
    let columns: Vec<Vec<f64>> = series
        .iter()
        .map(|(_, histogram)| reverse_cumulative(histogram, &points))
        .collect();

    let rows = points
        .iter()
        .enumerate()
        .filter(|&(_, &x)| x > 0 && x <= last_point)
        .map(|(i, &x)| GraphRow::new(x, columns.iter().map(|column| column[i]).collect()))
        .collect();

    let names = series.iter().map(|(name, _)| name.clone()).collect();
    GraphTable::new(names, rows)
}

/// Fraction of participants at or above each point, right-to-left.
fn reverse_cumulative(histogram: &Histogram, points: &[u64]) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let total = histogram.participants().max(1) as f64;
    let mut running = 0_u64;
    let mut values = vec![0.0; points.len()];
    for (value, &x) in values.iter_mut().zip(points).rev() {
        running += histogram.get(x);
        #[allow(clippy::cast_precision_loss)]
        let fraction = running as f64 / total;
        *value = fraction;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, histogram: Histogram) -> (String, Histogram) {
        (name.to_string(), histogram)
    }

    #[test]
    fn test_points_with_surrounding_gaps() {
        assert_eq!(
            points_with_surrounding_gaps(&[1, 2, 3, 10, 11, 13]),
            vec![1, 2, 3, 4, 9, 10, 11, 12, 13]
        );
    }

    #[test]
    fn test_points_with_surrounding_gaps_edges() {
        assert!(points_with_surrounding_gaps(&[]).is_empty());
        assert_eq!(points_with_surrounding_gaps(&[7]), vec![7]);
        // Gap of three: both brackets, no interior
        assert_eq!(points_with_surrounding_gaps(&[0, 3]), vec![0, 1, 2, 3]);
        assert_eq!(points_with_surrounding_gaps(&[0, 100]), vec![0, 1, 99, 100]);
    }

    #[test]
    fn test_graph_table_reverse_cumulative() {
        let table = distributions_to_graph_table(
            &[
                named("control", Histogram::from([(0, 5), (1, 3), (2, 2)])),
                named("blue", Histogram::from([(0, 2), (1, 4), (3, 4)])),
            ],
            3,
        );

        assert_eq!(table.names(), ["control".to_string(), "blue".to_string()]);
        let xs: Vec<u64> = table.rows().iter().map(GraphRow::x).collect();
        assert_eq!(xs, vec![1, 2, 3]);
        assert_eq!(table.series("control"), Some(vec![(1, 0.5), (2, 0.2), (3, 0.0)]));
        assert_eq!(table.series("blue"), Some(vec![(1, 0.8), (2, 0.4), (3, 0.4)]));
    }

    #[test]
    fn test_graph_table_fills_gaps() {
        let table = distributions_to_graph_table(&[named("a", Histogram::from([(0, 6), (6, 4)]))], 3);
        let xs: Vec<u64> = table.rows().iter().map(GraphRow::x).collect();
        assert_eq!(xs, vec![1, 5, 6]);
        // Flat across the gap
        for row in table.rows() {
            assert!((row.values()[0] - 0.4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_graph_table_truncates_sparse_tail() {
        let table = distributions_to_graph_table(
            &[named("a", Histogram::from([(0, 10), (1, 5), (2, 3), (3, 1), (9, 1)]))],
            3,
        );
        let xs: Vec<u64> = table.rows().iter().map(GraphRow::x).collect();
        assert_eq!(xs, vec![1, 2]);
    }

    #[test]
    fn test_graph_table_threshold_uses_max_across_series() {
        let table = distributions_to_graph_table(
            &[
                named("a", Histogram::from([(0, 10), (4, 1)])),
                named("b", Histogram::from([(0, 10), (4, 3)])),
            ],
            3,
        );
        assert_eq!(table.rows().last().map(GraphRow::x), Some(4));
    }

    #[test]
    fn test_graph_table_starts_at_smallest_count() {
        let table = distributions_to_graph_table(
            &[
                named("control", Histogram::from([(5, 3), (9, 4), (20, 1)])),
                named("blue", Histogram::from([(6, 5), (7, 1)])),
            ],
            1,
        );
        let xs: Vec<u64> = table.rows().iter().map(GraphRow::x).collect();
        assert_eq!(xs, vec![5, 6, 7, 8, 9, 10, 19, 20]);
        assert_eq!(table.rows()[0].values(), &[1.0, 1.0]);
    }

    #[test]
    fn test_graph_table_nothing_significant() {
        let table = distributions_to_graph_table(&[named("a", Histogram::from([(1, 2), (2, 1)]))], 3);
        assert!(table.is_empty());
        assert_eq!(table.names().len(), 1);
    }

    #[test]
    fn test_graph_table_empty_series_is_all_zero() {
        let table = distributions_to_graph_table(
            &[
                named("a", Histogram::from([(0, 3), (1, 3)])),
                named("empty", Histogram::new()),
            ],
            3,
        );
        assert_eq!(table.series("empty"), Some(vec![(1, 0.0)]));
        assert_eq!(table.series("a"), Some(vec![(1, 0.5)]));
    }
}
