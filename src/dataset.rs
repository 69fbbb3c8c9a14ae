//! Turn an uploaded table into a plottable x/y series.

use super::*;
use data::Table;
use std::fmt;

/// The cleaned first two columns of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    /// Header of the first column, `None` if it is unnamed.
    pub x_label: Option<String>,
    /// Header of the second column, `None` if it is unnamed.
    pub y_label: Option<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Rows dropped because the x or y cell was missing or not a number.
    pub dropped: usize,
}

/// Why a table could not be plotted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    TooFewColumns,
    EmptyAfterCleaning,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::TooFewColumns => write!(f, "needs at least 2 columns"),
            SkipReason::EmptyAfterCleaning => {
                write!(f, "no rows with both an x and a y value")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Series(NormalizedSeries),
    Skipped(SkipReason),
}

/// Normalize a table into an x/y series.
///
/// The first column is always x and the second always y, whatever their headers say.
/// Rows missing either value are dropped; cells holding text which is not a number count as
/// missing. This never fails, an unusable table is reported as [`Normalized::Skipped`].
///
/// # Example
/// ```rust
/// use chartme::data::{Cell, Headers, Table};
/// use chartme::dataset::{normalize, Normalized};
///
/// let table = Table::new(
///     Headers::from_iter(["Time", "Value"]),
///     vec![
///         vec![Cell::from(1.), Cell::from(10.)],
///         vec![Cell::Empty, Cell::from(20.)],
///         vec![Cell::from(4.), Cell::from(40.)],
///     ],
/// );
///
/// match normalize(&table) {
///     Normalized::Series(s) => {
///         assert_eq!(s.x, vec![1., 4.]);
///         assert_eq!(s.y, vec![10., 40.]);
///     }
///     Normalized::Skipped(r) => panic!("skipped: {r}"),
/// }
/// ```
pub fn normalize(table: &Table) -> Normalized {
    if table.width() < 2 {
        return Normalized::Skipped(SkipReason::TooFewColumns);
    }

    let hdrs = table.headers();
    let x_label = axis_label(hdrs.get(0));
    let y_label = axis_label(hdrs.get(1));

    let mut x = Vec::with_capacity(table.len());
    let mut y = Vec::with_capacity(table.len());
    let mut dropped = 0;

    for row in table.rows() {
        let xy = row
            .get(0)
            .and_then(|c| c.as_num())
            .zip(row.get(1).and_then(|c| c.as_num()));

        match xy {
            Some((a, b)) => {
                x.push(a);
                y.push(b);
            }
            None => {
                log::trace!("dropping row {}: missing x or y", row.index() + 1);
                dropped += 1;
            }
        }
    }

    if x.is_empty() {
        return Normalized::Skipped(SkipReason::EmptyAfterCleaning);
    }

    Normalized::Series(NormalizedSeries {
        x_label,
        y_label,
        x,
        y,
        dropped,
    })
}

/// A header is unnamed when blank, a generated `Unnamed: n` placeholder, or `nan`.
fn axis_label(header: Option<&str>) -> Option<String> {
    let h = header?.trim();
    let unnamed = h.is_empty() || h.contains("Unnamed") || h == "nan";
    (!unnamed).then(|| h.to_string())
}

/// Axis titles of a chart, set once by the first dataset which produces a series.
///
/// This is threaded through dataset processing as a fold accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisTitles {
    pub x: String,
    pub y: String,
    established: bool,
}

impl AxisTitles {
    pub const FALLBACK_X: &'static str = "X";
    pub const FALLBACK_Y: &'static str = "Y";

    /// Take the titles from `series` unless already established.
    ///
    /// Unnamed labels fall back to `X` / `Y`. The first series always wins, even if both its
    /// labels are unnamed.
    pub fn establish(self, series: &NormalizedSeries) -> Self {
        if self.established {
            return self;
        }

        Self {
            x: series
                .x_label
                .clone()
                .unwrap_or_else(|| Self::FALLBACK_X.to_string()),
            y: series
                .y_label
                .clone()
                .unwrap_or_else(|| Self::FALLBACK_Y.to_string()),
            established: true,
        }
    }

    pub fn is_established(&self) -> bool {
        self.established
    }
}

impl Default for AxisTitles {
    fn default() -> Self {
        Self {
            x: Self::FALLBACK_X.to_string(),
            y: Self::FALLBACK_Y.to_string(),
            established: false,
        }
    }
}
