//! Monthly macro panel preparation for the VAR.

use chrono::{Datelike, Months, NaiveDate};
use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::data::{Column, Table};
use crate::defaults::{
    ARTIFACT_MARKER, CORE_CPI, DATE_COLUMN, DATE_FORMAT, D_INDPRO, INDPRO, INFLATION, VAR_ORDERING,
};
use crate::types::{AnalysisError, Result};

/// Macro table indexed by month-start dates.
///
/// Invariant: `dates` is strictly increasing, one calendar month apart, and
/// every date falls on the first of its month. Columns of `data` are aligned
/// with `dates`.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroPanel {
    pub dates: Vec<NaiveDate>,
    pub data: Table,
}

impl MacroPanel {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn series(&self, name: &str) -> Result<&[Option<f64>]> {
        self.data.numeric(name)
    }
}

/// Differenced panel holding exactly the VAR variables, in VAR order.
#[derive(Clone, Debug, PartialEq)]
pub struct VarPanel {
    pub dates: Vec<NaiveDate>,
    pub names: Vec<String>,
    /// `dates.len()` rows by `names.len()` columns, all finite.
    pub data: Array2<f64>,
}

impl VarPanel {
    pub fn nobs(&self) -> usize {
        self.data.nrows()
    }

    pub fn series(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.data.column(j))
    }
}

/// Index the raw macro table by its observation date.
///
/// Dates are parsed with `%m/%d/%Y`, export-artifact columns (names containing
/// `Unnamed`) are dropped and rows are sorted by date.
///
/// # Errors
/// * `InvalidDate` if any date cell is missing or does not match the format
/// * `DuplicateDate` if two rows share a date
/// * `IrregularFrequency` if the dates are not consecutive month starts
pub fn prepare_raw_data(table: &Table) -> Result<MacroPanel> {
    let cells: Vec<Option<String>> = match table.column(DATE_COLUMN)? {
        Column::Text(v) => v.clone(),
        Column::Numeric(v) => v.iter().map(|c| c.map(|f| f.to_string())).collect(),
    };

    let mut dates = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        let value = cell.as_deref().unwrap_or("");
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
            AnalysisError::InvalidDate {
                row,
                value: value.to_string(),
                format: DATE_FORMAT.to_string(),
            }
        })?;
        dates.push(date);
    }

    let mut order: Vec<usize> = (0..dates.len()).collect();
    order.sort_by_key(|&i| dates[i]);
    let sorted: Vec<NaiveDate> = order.iter().map(|&i| dates[i]).collect();

    for pair in sorted.windows(2) {
        if pair[0] == pair[1] {
            return Err(AnalysisError::DuplicateDate(pair[0]));
        }
    }
    check_month_start_frequency(&sorted)?;

    let kept = table.without_columns(|name| name == DATE_COLUMN || name.contains(ARTIFACT_MARKER));
    let mut names = Vec::with_capacity(kept.ncols());
    let mut columns = Vec::with_capacity(kept.ncols());
    for name in kept.names() {
        let reordered = match kept.column(name)? {
            Column::Numeric(v) => Column::Numeric(order.iter().map(|&i| v[i]).collect()),
            Column::Text(v) => Column::Text(order.iter().map(|&i| v[i].clone()).collect()),
        };
        names.push(name.clone());
        columns.push(reordered);
    }

    debug!(
        rows = sorted.len(),
        dropped = table.ncols() - kept.ncols() - 1,
        "prepared macro panel"
    );

    Ok(MacroPanel {
        dates: sorted,
        data: Table::from_columns(names, columns)?,
    })
}

fn check_month_start_frequency(dates: &[NaiveDate]) -> Result<()> {
    if let Some(&bad) = dates.iter().find(|d| d.day() != 1) {
        return Err(AnalysisError::IrregularFrequency {
            previous: bad,
            next: bad,
        });
    }
    for pair in dates.windows(2) {
        if pair[0].checked_add_months(Months::new(1)) != Some(pair[1]) {
            return Err(AnalysisError::IrregularFrequency {
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

fn first_difference(values: &[Option<f64>]) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| match (i.checked_sub(1).and_then(|j| values[j]), values[i]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        })
        .collect()
}

/// Build the VAR panel: INFLATION = diff(CORESTICKM159SFRBATL),
/// D_INDPRO = diff(INDPRO), plus FEDFUNDS, UNCERTAINTY and LAYOFFS in levels.
///
/// Rows with any undefined modeling value are dropped, so the first row is
/// always removed.
///
/// # Errors
/// `MissingColumn` / `NonNumericColumn` if a source series is absent.
pub fn difference_variables(panel: &MacroPanel) -> Result<VarPanel> {
    let inflation = first_difference(panel.series(CORE_CPI)?);
    let d_indpro = first_difference(panel.series(INDPRO)?);

    let mut columns: Vec<&[Option<f64>]> = Vec::with_capacity(VAR_ORDERING.len());
    for name in VAR_ORDERING {
        let col = match name {
            INFLATION => inflation.as_slice(),
            D_INDPRO => d_indpro.as_slice(),
            other => panel.series(other)?,
        };
        columns.push(col);
    }

    let defined = |i: usize| {
        columns
            .iter()
            .all(|c| c[i].map_or(false, |v| !v.is_nan()))
    };
    let rows: Vec<usize> = (0..panel.len()).filter(|&i| defined(i)).collect();

    let data = Array2::from_shape_fn((rows.len(), columns.len()), |(r, j)| {
        columns[j][rows[r]].unwrap_or(f64::NAN)
    });

    debug!(
        rows_in = panel.len(),
        rows_out = rows.len(),
        "differenced macro panel"
    );

    Ok(VarPanel {
        dates: rows.iter().map(|&i| panel.dates[i]).collect(),
        names: VAR_ORDERING.iter().map(|s| s.to_string()).collect(),
        data,
    })
}
