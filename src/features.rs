//! Cross-sectional design matrix construction for the layoffs regression.

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::data::{Column, Table};
use crate::defaults::{CONST_NAME, DIFF_SUFFIX, INF_SENTINEL};
use crate::types::{AnalysisError, FeatureSpec, Result};

/// Regression inputs: named predictor columns (intercept last) and target.
///
/// Invariant: `x.nrows() == y.len()` equals the company table's row count and
/// every entry is finite.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignMatrix {
    pub names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl DesignMatrix {
    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    /// Imputed values of predictor `name`.
    pub fn column(&self, name: &str) -> Option<Array1<f64>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|j| self.x.column(j).to_owned())
    }
}

fn diff_name(source: &str) -> String {
    format!("{source}{DIFF_SUFFIX}")
}

/// Working copy of `table` with the derived predictor columns added.
///
/// Funding² is computed from the funding column unless the table already
/// carries it. For each declared macro column present (and when
/// `include_macro_diffs` is set) a `<macro>_diff` first difference is added,
/// with the leading row and any undefined difference set to 0.
///
/// # Errors
/// Returns `AnalysisError::MissingColumn` / `NonNumericColumn` if the funding
/// column is absent or not numeric.
pub fn with_derived_columns(table: &Table, spec: &FeatureSpec) -> Result<Table> {
    let mut work = table.clone();

    if !work.has_column(&spec.funding_squared_column) {
        let squared = table
            .numeric(&spec.funding_column)?
            .iter()
            .map(|v| v.map(|f| f * f))
            .collect();
        work.set_column(&spec.funding_squared_column, Column::Numeric(squared))?;
    }

    if spec.include_macro_diffs {
        for source in &spec.macro_columns {
            if !table.has_column(source) {
                continue;
            }
            let values = table.numeric(source)?;
            let mut diffs = Vec::with_capacity(values.len());
            for i in 0..values.len() {
                let d = match (i.checked_sub(1).and_then(|j| values[j]), values[i]) {
                    (Some(prev), Some(cur)) => cur - prev,
                    _ => 0.0,
                };
                diffs.push(Some(if d.is_nan() { 0.0 } else { d }));
            }
            work.set_column(&diff_name(source), Column::Numeric(diffs))?;
        }
    }

    Ok(work)
}

/// Resolve the predictor names for `table` (before the intercept).
///
/// Order: funding, funding², every column starting with one of the declared
/// indicator prefixes in table order, then the macro differences.
pub fn resolve_predictors(table: &Table, spec: &FeatureSpec) -> Vec<String> {
    let mut predictors = vec![
        spec.funding_column.clone(),
        spec.funding_squared_column.clone(),
    ];

    for name in table.names() {
        if predictors.contains(name) || *name == spec.target_column {
            continue;
        }
        if spec
            .indicator_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
        {
            predictors.push(name.clone());
        }
    }

    if spec.include_macro_diffs {
        for source in &spec.macro_columns {
            if table.has_column(source) {
                predictors.push(diff_name(source));
            }
        }
    }

    predictors
}

/// Build the regression design from the raw company table.
///
/// Missing predictor values are replaced by the column mean, infinities by
/// `INF_SENTINEL` regardless of sign, and missing targets by the target mean.
/// A predictor column holding any infinity fills its gaps with the sentinel.
/// No row is dropped and `table` is left untouched.
///
/// # Errors
/// Fails when a required column is absent or non-numeric, or when the target
/// contains infinities (imputation only covers missing targets).
pub fn build_design(table: &Table, spec: &FeatureSpec) -> Result<DesignMatrix> {
    let work = with_derived_columns(table, spec)?;
    let mut names = resolve_predictors(&work, spec);
    let rows = work.nrows();

    let mut x = Array2::<f64>::zeros((rows, names.len() + 1));
    for (j, name) in names.iter().enumerate() {
        let values = impute_column(name, work.numeric(name)?);
        for (i, v) in values.into_iter().enumerate() {
            x[[i, j]] = v;
        }
    }
    x.column_mut(names.len()).fill(1.0);
    names.push(CONST_NAME.to_string());

    let y = impute_target(&spec.target_column, work.numeric(&spec.target_column)?)?;

    Ok(DesignMatrix { names, x, y })
}

/// Mean of the finite observed entries, or `None` when there are none.
fn finite_mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fill value for missing cells: a column holding any infinity has an
/// infinite mean, so its gaps get the sentinel like the infinities do.
fn fill_value(name: &str, values: &[Option<f64>]) -> f64 {
    if values.iter().flatten().any(|v| v.is_infinite()) {
        return INF_SENTINEL;
    }
    finite_mean(values).unwrap_or_else(|| {
        warn!(column = name, "no observed values; filling with 0");
        0.0
    })
}

pub(crate) fn impute_column(name: &str, values: &[Option<f64>]) -> Vec<f64> {
    let mean = fill_value(name, values);

    let mut missing = 0usize;
    let mut infinite = 0usize;
    let out = values
        .iter()
        .map(|v| match v {
            Some(f) if f.is_infinite() => {
                infinite += 1;
                INF_SENTINEL
            }
            Some(f) if !f.is_nan() => *f,
            _ => {
                missing += 1;
                mean
            }
        })
        .collect();

    if missing > 0 || infinite > 0 {
        debug!(column = name, missing, infinite, mean, "imputed design column");
    }
    out
}

fn impute_target(name: &str, values: &[Option<f64>]) -> Result<Array1<f64>> {
    if values.iter().flatten().any(|v| v.is_infinite()) {
        return Err(AnalysisError::MissingValues(name.to_string()));
    }
    let mean = finite_mean(values).ok_or(AnalysisError::EmptyInput)?;
    Ok(values
        .iter()
        .map(|v| match v {
            Some(f) if !f.is_nan() => *f,
            _ => mean,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{FUNDING_COLUMN, FUNDING_SQUARED_COLUMN, LAID_OFF_COLUMN};
    use approx::assert_relative_eq;

    fn company_table() -> Table {
        Table::from_columns(
            vec![
                FUNDING_COLUMN.into(),
                FUNDING_SQUARED_COLUMN.into(),
                "Stage_IPO".into(),
                "Industry_Retail".into(),
                LAID_OFF_COLUMN.into(),
            ],
            vec![
                Column::Numeric(vec![Some(100.0), Some(200.0), None]),
                Column::from_values(&[10000.0, 40000.0, 90000.0]),
                Column::from_values(&[1.0, 0.0, 1.0]),
                Column::from_values(&[0.0, 1.0, 1.0]),
                Column::Numeric(vec![Some(10.0), Some(15.0), None]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_mean_imputation_scenario() {
        let design = build_design(&company_table(), &FeatureSpec::default()).unwrap();

        assert_eq!(
            design.names,
            vec![
                FUNDING_COLUMN,
                FUNDING_SQUARED_COLUMN,
                "Stage_IPO",
                "Industry_Retail",
                "const"
            ]
        );
        let funding = design.column(FUNDING_COLUMN).unwrap();
        assert_relative_eq!(funding[2], 150.0);
        assert_relative_eq!(design.y[2], 12.5);
        // Pre-existing squared column is used as-is.
        assert_relative_eq!(design.column(FUNDING_SQUARED_COLUMN).unwrap()[2], 90000.0);
        assert_eq!(design.column("const").unwrap().to_vec(), vec![1.0; 3]);
        assert_eq!(design.nrows(), 3);
    }

    #[test]
    fn test_build_design_is_idempotent() {
        let table = company_table();
        let spec = FeatureSpec::default();
        let a = build_design(&table, &spec).unwrap();
        let b = build_design(&table, &spec).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_source_table_is_not_modified() {
        let table = Table::from_columns(
            vec![FUNDING_COLUMN.into(), LAID_OFF_COLUMN.into()],
            vec![
                Column::from_values(&[1.0, 2.0]),
                Column::from_values(&[3.0, 4.0]),
            ],
        )
        .unwrap();
        let before = table.clone();
        let design = build_design(&table, &FeatureSpec::default()).unwrap();
        assert_eq!(table, before);
        assert_eq!(design.column(FUNDING_SQUARED_COLUMN).unwrap().to_vec(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_infinities_share_one_sentinel() {
        let out = impute_column(
            "x",
            &[Some(f64::INFINITY), Some(f64::NEG_INFINITY), Some(2.0), None],
        );
        assert_eq!(out, vec![1e9, 1e9, 2.0, 1e9]);
    }

    #[test]
    fn test_missing_with_infinite_column_uses_sentinel() {
        let out = impute_column("x", &[Some(f64::INFINITY), Some(2.0), Some(4.0), None]);
        assert_eq!(out, vec![1e9, 2.0, 4.0, 1e9]);

        let finite = impute_column("x", &[Some(2.0), Some(4.0), None]);
        assert_eq!(finite, vec![2.0, 4.0, 3.0]);
    }

    #[test]
    fn test_blank_boolean_indicator_is_imputed() {
        let csv = "\
$ Raised (mm),Stage_IPO,# Laid Off
10,True,12
20,,18
30,False,25
40,True,33
";
        let table = crate::data::read_table(csv.as_bytes()).unwrap();
        let design = build_design(&table, &FeatureSpec::default()).unwrap();

        let ipo = design.column("Stage_IPO").unwrap();
        assert_relative_eq!(ipo[0], 1.0);
        assert_relative_eq!(ipo[1], 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(ipo[2], 0.0);
    }

    #[test]
    fn test_all_missing_column_fills_zero() {
        assert_eq!(impute_column("x", &[None, None]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_predictor_order_follows_table() {
        let table = Table::from_columns(
            vec![
                "Industry_Media".into(),
                FUNDING_COLUMN.into(),
                "Stage_Seed".into(),
                "Company".into(),
                "Industry_Retail".into(),
                LAID_OFF_COLUMN.into(),
            ],
            vec![
                Column::from_values(&[0.0]),
                Column::from_values(&[1.0]),
                Column::from_values(&[1.0]),
                Column::Text(vec![Some("a".into())]),
                Column::from_values(&[1.0]),
                Column::from_values(&[1.0]),
            ],
        )
        .unwrap();
        let predictors = resolve_predictors(&table, &FeatureSpec::default());
        assert_eq!(
            predictors,
            vec![
                FUNDING_COLUMN,
                FUNDING_SQUARED_COLUMN,
                "Industry_Media",
                "Stage_Seed",
                "Industry_Retail"
            ]
        );
    }

    #[test]
    fn test_macro_differences_are_optional() {
        let table = Table::from_columns(
            vec![FUNDING_COLUMN.into(), "DFF".into(), LAID_OFF_COLUMN.into()],
            vec![
                Column::from_values(&[1.0, 2.0, 3.0, 4.0]),
                Column::Numeric(vec![Some(1.0), Some(1.5), None, Some(2.5)]),
                Column::from_values(&[5.0, 6.0, 7.0, 8.0]),
            ],
        )
        .unwrap();

        let with = build_design(&table, &FeatureSpec::default()).unwrap();
        assert!(with.names.contains(&"DFF_diff".to_string()));
        assert!(!with.names.contains(&"USEPUINDXD_diff".to_string()));
        assert_eq!(with.column("DFF_diff").unwrap().to_vec(), vec![0.0, 0.5, 0.0, 0.0]);

        let spec = FeatureSpec {
            include_macro_diffs: false,
            ..Default::default()
        };
        let without = build_design(&table, &spec).unwrap();
        assert!(!without.names.iter().any(|n| n.ends_with("_diff")));
        assert_eq!(without.names.len(), with.names.len() - 1);
    }

    #[test]
    fn test_missing_funding_column() {
        let table =
            Table::from_columns(vec![LAID_OFF_COLUMN.into()], vec![Column::from_values(&[1.0])])
                .unwrap();
        assert!(matches!(
            build_design(&table, &FeatureSpec::default()),
            Err(AnalysisError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_infinite_target_is_rejected() {
        let table = Table::from_columns(
            vec![FUNDING_COLUMN.into(), LAID_OFF_COLUMN.into()],
            vec![
                Column::from_values(&[1.0, 2.0]),
                Column::from_values(&[3.0, f64::INFINITY]),
            ],
        )
        .unwrap();
        assert!(matches!(
            build_design(&table, &FeatureSpec::default()),
            Err(AnalysisError::MissingValues(_))
        ));
    }
}
