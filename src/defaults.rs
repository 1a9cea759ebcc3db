//! Default constants for feature construction, estimation and reporting.

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
pub const INF_SENTINEL: f64 = 1e9;
pub const DEFAULT_MAXLAGS: usize = 12;
pub const DEFAULT_IRF_HORIZON: usize = 20;

/// Relative pivot below which an equilibrated Gram matrix is treated as singular.
pub const RANK_TOL: f64 = 1e-10;

pub const FUNDING_COLUMN: &str = "$ Raised (mm)";
pub const FUNDING_SQUARED_COLUMN: &str = "$ Raised (mm)^2";
pub const LAID_OFF_COLUMN: &str = "# Laid Off";
pub const STAGE_PREFIX: &str = "Stage_";
pub const INDUSTRY_PREFIX: &str = "Industry_";
pub const MACRO_DIFF_SOURCES: [&str; 2] = ["USEPUINDXD", "DFF"];
pub const DIFF_SUFFIX: &str = "_diff";
pub const CONST_NAME: &str = "const";

pub const DATE_COLUMN: &str = "observation_date";
pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub const ARTIFACT_MARKER: &str = "Unnamed";

pub const FEDFUNDS: &str = "FEDFUNDS";
pub const CORE_CPI: &str = "CORESTICKM159SFRBATL";
pub const INDPRO: &str = "INDPRO";
pub const LAYOFFS: &str = "LAYOFFS";
pub const UNCERTAINTY: &str = "UNCERTAINTY";
pub const INFLATION: &str = "INFLATION";
pub const D_INDPRO: &str = "D_INDPRO";

/// Cholesky ordering of the VAR system; earlier variables get causal priority.
pub const VAR_ORDERING: [&str; 5] = [D_INDPRO, INFLATION, FEDFUNDS, UNCERTAINTY, LAYOFFS];

/// Levels checked before differencing (ADF with maxlag 1).
pub const LEVEL_SERIES: [&str; 5] = [LAYOFFS, UNCERTAINTY, FEDFUNDS, CORE_CPI, INDPRO];
/// Differenced series checked with the default ADF lag length.
pub const DIFFERENCED_SERIES: [&str; 2] = [INFLATION, D_INDPRO];
pub const LEVEL_ADF_MAXLAG: usize = 1;

/// Impulses whose effect on LAYOFFS is reported by default.
pub const DEFAULT_IMPULSES: [&str; 4] = [INFLATION, D_INDPRO, FEDFUNDS, UNCERTAINTY];
