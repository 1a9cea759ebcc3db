//! # layoff_macro
//!
//! Statistical analysis of tech-sector layoffs against macroeconomic conditions.
//!
//! The crate runs two independent paths:
//!
//! * **Cross-sectional**: company-level OLS of layoffs on funding, funding²,
//!   stage/industry indicators and optional macro differences
//! * **Time-series**: ADF stationarity checks, AIC lag selection for a
//!   five-variable VAR and orthogonalized impulse responses of LAYOFFS
//!
//! ## Example
//!
//! ```
//! use layoff_macro::{read_table, run_regression, FeatureSpec};
//!
//! let csv = "\
//! $ Raised (mm),Stage_IPO,# Laid Off
//! 10,1,12
//! 25,0,20
//! 40,0,31
//! 55,1,35
//! 70,0,52
//! 85,1,57
//! 100,1,71
//! 115,0,80
//! ";
//! let companies = read_table(csv.as_bytes()).unwrap();
//! let spec = FeatureSpec {
//!     include_macro_diffs: false,
//!     ..Default::default()
//! };
//!
//! let fit = run_regression(&companies, &spec).unwrap();
//! println!("R²: {:.4}  adj. R²: {:.4}", fit.r2, fit.adj_r2);
//! for row in fit.significant() {
//!     println!("{} p={:.4}", row.predictor, row.p_value);
//! }
//! ```

// Module declarations
pub mod adf;
pub mod data;
mod defaults;
pub mod features;
pub mod irf;
mod linalg;
pub mod ols;
pub mod pipeline;
pub mod timeseries;
mod types;
pub mod var;

// Re-export public types
pub use data::{Column, Table};
pub use features::DesignMatrix;
pub use irf::ImpulseResponse;
pub use pipeline::{AnalysisReport, InputPaths, Inputs, VarAnalysis};
pub use timeseries::{MacroPanel, VarPanel};
pub use types::{
    classify_stationarity, AdfReport, AdfResult, AnalysisConfig, AnalysisError,
    CoefficientEstimate, EquationCoefficients, EquationStats, FeatureSpec, LagCriteria, PValueRow, RegressionResult,
    ResponseCurve, ResponsePoint, Result, StationarityVerdict,
};
pub use var::{FittedVar, InfoCriteria, LagSelection, VarModel};

// Re-export main public functions
pub use adf::{adf_test, stationarity_report};
pub use data::{load_table, read_table};
pub use features::{build_design, resolve_predictors, with_derived_columns};
pub use irf::impulse_responses;
pub use ols::fit_ols;
pub use pipeline::{load_inputs, run_analysis, run_regression, run_var_analysis};
pub use timeseries::{difference_variables, prepare_raw_data};
pub use var::select_and_fit;

/// Series and column names used by the analysis.
pub mod names {
    pub use crate::defaults::{
        CORE_CPI, DATE_COLUMN, D_INDPRO, FEDFUNDS, FUNDING_COLUMN, FUNDING_SQUARED_COLUMN,
        INDPRO, INFLATION, LAID_OFF_COLUMN, LAYOFFS, UNCERTAINTY, VAR_ORDERING,
    };
}
