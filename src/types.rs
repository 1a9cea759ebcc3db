use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::defaults::{
    DEFAULT_IMPULSES, DEFAULT_IRF_HORIZON, DEFAULT_MAXLAGS, FEDFUNDS, FUNDING_COLUMN,
    FUNDING_SQUARED_COLUMN, INDUSTRY_PREFIX, LAID_OFF_COLUMN, MACRO_DIFF_SOURCES,
    SIGNIFICANCE_LEVEL, STAGE_PREFIX,
};

/// Which columns of the company table feed the cross-sectional regression.
///
/// Indicator membership is declared through `indicator_prefixes` and resolved
/// once against the table header, so the predictor list is deterministic.
///
/// # Example
/// ```
/// use layoff_macro::FeatureSpec;
/// let spec = FeatureSpec {
///     include_macro_diffs: false,
///     ..Default::default()
/// };
/// assert_eq!(spec.indicator_prefixes, vec!["Stage_", "Industry_"]);
/// ```
#[derive(Clone, Debug)]
pub struct FeatureSpec {
    pub funding_column: String,
    /// Name of the squared-funding predictor; computed when the table lacks it.
    pub funding_squared_column: String,
    pub target_column: String,
    pub indicator_prefixes: Vec<String>,
    /// Macro level columns whose first differences may join the predictors.
    pub macro_columns: Vec<String>,
    /// Append `<macro>_diff` predictors for each macro column present.
    pub include_macro_diffs: bool,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            funding_column: FUNDING_COLUMN.to_string(),
            funding_squared_column: FUNDING_SQUARED_COLUMN.to_string(),
            target_column: LAID_OFF_COLUMN.to_string(),
            indicator_prefixes: vec![STAGE_PREFIX.to_string(), INDUSTRY_PREFIX.to_string()],
            macro_columns: MACRO_DIFF_SOURCES.iter().map(|s| s.to_string()).collect(),
            include_macro_diffs: true,
        }
    }
}

/// Configuration for a full analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub features: FeatureSpec,
    /// Largest VAR lag order tried during selection.
    pub maxlags: usize,
    /// Last impulse-response step (responses cover 0..=horizon).
    pub irf_horizon: usize,
    /// Impulse variables whose effect on LAYOFFS is reported.
    pub irf_impulses: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            features: FeatureSpec::default(),
            maxlags: DEFAULT_MAXLAGS,
            irf_horizon: DEFAULT_IRF_HORIZON,
            irf_impulses: DEFAULT_IMPULSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Inference for a single regression coefficient.
#[derive(Clone, Debug, Serialize)]
pub struct CoefficientEstimate {
    pub name: String,
    pub coef: f64,
    pub std_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

/// Coefficient inference for one VAR equation, `const` first then lag terms
/// named `L{lag}.{variable}`.
#[derive(Clone, Debug, Serialize)]
pub struct EquationCoefficients {
    pub equation: String,
    pub coefficients: Vec<CoefficientEstimate>,
}

/// Predictor / p-value pair as shown in the significance tables.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PValueRow {
    pub predictor: String,
    pub p_value: f64,
}

/// Cross-sectional OLS fit.
#[derive(Clone, Debug, Serialize)]
pub struct RegressionResult {
    /// One entry per design column, in design order (includes `const`).
    pub coefficients: Vec<CoefficientEstimate>,
    pub r2: f64,
    pub adj_r2: f64,
    pub rmse: f64,
    pub n_obs: usize,
    pub df_resid: usize,
}

impl RegressionResult {
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.estimate(name).map(|c| c.coef)
    }

    pub fn p_value(&self, name: &str) -> Option<f64> {
        self.estimate(name).map(|c| c.p_value)
    }

    pub fn estimate(&self, name: &str) -> Option<&CoefficientEstimate> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Predictors with p < 0.05.
    pub fn significant(&self) -> Vec<PValueRow> {
        self.partition(|p| p < SIGNIFICANCE_LEVEL)
    }

    /// Predictors with p > 0.05.
    ///
    /// A p-value of exactly 0.05 is in neither this list nor `significant()`.
    pub fn non_significant(&self) -> Vec<PValueRow> {
        self.partition(|p| p > SIGNIFICANCE_LEVEL)
    }

    fn partition(&self, keep: impl Fn(f64) -> bool) -> Vec<PValueRow> {
        self.coefficients
            .iter()
            .filter(|c| keep(c.p_value))
            .map(|c| PValueRow {
                predictor: c.name.clone(),
                p_value: c.p_value,
            })
            .collect()
    }
}

/// Augmented Dickey-Fuller test output.
#[derive(Clone, Debug, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the final regression.
    pub used_lag: usize,
    pub n_obs: usize,
    /// 1%, 5% and 10% critical values.
    pub critical_values: [f64; 3],
    /// AIC of the selected autolag regression.
    pub ic_best: f64,
}

/// Stationarity classification at the 5% level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StationarityVerdict {
    Stationary,
    /// Non-stationary, but deliberately kept in levels (FEDFUNDS only).
    NonStationaryNotDifferenced,
    RequiresDifferencing,
}

impl StationarityVerdict {
    pub fn is_stationary(self) -> bool {
        matches!(self, Self::Stationary)
    }
}

impl fmt::Display for StationarityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Stationary => "stationary",
            Self::NonStationaryNotDifferenced => "non-stationary, not differenced",
            Self::RequiresDifferencing => "non-stationary, requires differencing",
        };
        f.write_str(text)
    }
}

/// Classify an ADF p-value for `variable`.
///
/// FEDFUNDS stays in levels in the VAR even when the test rejects
/// stationarity; no other series gets that treatment.
pub fn classify_stationarity(variable: &str, p_value: f64) -> StationarityVerdict {
    if p_value <= SIGNIFICANCE_LEVEL {
        StationarityVerdict::Stationary
    } else if variable == FEDFUNDS {
        StationarityVerdict::NonStationaryNotDifferenced
    } else {
        StationarityVerdict::RequiresDifferencing
    }
}

/// One ADF check in the stationarity report.
#[derive(Clone, Debug, Serialize)]
pub struct AdfReport {
    pub variable: String,
    /// True for checks run on the differenced panel.
    pub differenced: bool,
    pub result: AdfResult,
    pub verdict: StationarityVerdict,
}

/// Information criteria for one candidate lag order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LagCriteria {
    pub lag: usize,
    pub aic: f64,
    pub hqic: f64,
    pub bic: f64,
}

/// Per-equation fit summary of a VAR.
#[derive(Clone, Debug, Serialize)]
pub struct EquationStats {
    pub equation: String,
    pub rmse: f64,
    pub r2: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResponsePoint {
    pub step: usize,
    pub value: f64,
}

/// Orthogonalized response of one variable to a shock in another.
#[derive(Clone, Debug, Serialize)]
pub struct ResponseCurve {
    pub impulse: String,
    pub response: String,
    pub points: Vec<ResponsePoint>,
}

/// Library error type.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("missing column {column:?} (found {available:?})")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("column {0:?} is not numeric")]
    NonNumericColumn(String),
    #[error("input lengths mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("empty input")]
    EmptyInput,
    #[error("row {row}: cannot parse date {value:?} with format {format}")]
    InvalidDate {
        row: usize,
        value: String,
        format: String,
    },
    #[error("duplicate date {0} in index")]
    DuplicateDate(chrono::NaiveDate),
    #[error("index is not month-start monthly: {previous} followed by {next}")]
    IrregularFrequency {
        previous: chrono::NaiveDate,
        next: chrono::NaiveDate,
    },
    #[error("column {0:?} contains missing or non-finite values")]
    MissingValues(String),
    #[error("design matrix is rank deficient at column {column:?}")]
    RankDeficient { column: String },
    #[error("insufficient observations: {required} required, {available} available")]
    InsufficientObservations { required: usize, available: usize },
    #[error("residual covariance matrix is not positive definite")]
    SingularCovariance,
    #[error("linear algebra failure: {0}")]
    Linalg(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
